//! Property-based tests for socialgraph
//!
//! Verifies follow/friend/count/pagination invariants for arbitrary graphs

use std::collections::BTreeSet;

use proptest::prelude::*;
use socialgraph::{Database, EdgeState, NewUser, RelationKind, UserId};

const USERS: usize = 8;

fn setup(n: usize) -> (Database, Vec<UserId>) {
    let db = Database::in_memory().unwrap();
    let new_users: Vec<NewUser> = (0..n)
        .map(|i| NewUser::new(format!("user{i}"), format!("user{i}@example.test")))
        .collect();
    let ids = db
        .users()
        .create_many(&new_users)
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    (db, ids)
}

/// Ordered (follower, followee) index pairs, self-pairs included; the
/// tests skip those.
fn prop_edge_list(max_len: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..USERS, 0..USERS), 0..max_len)
}

fn build(edges: &[(usize, usize)]) -> (Database, Vec<UserId>, BTreeSet<(usize, usize)>) {
    let (db, ids) = setup(USERS);
    let mut expected = BTreeSet::new();
    for &(a, b) in edges {
        if a == b {
            continue;
        }
        db.follows().follow(ids[a], ids[b]).unwrap();
        expected.insert((a, b));
    }
    (db, ids, expected)
}

// Property: friends == followings ∩ followers
proptest! {
    #[test]
    fn prop_friends_are_mutual_follows(edges in prop_edge_list(40)) {
        let (db, ids, _) = build(&edges);

        for &user in &ids {
            let followings: BTreeSet<UserId> =
                db.follows().following_ids(user).unwrap().into_iter().collect();
            let followers: BTreeSet<UserId> =
                db.follows().follower_ids(user).unwrap().into_iter().collect();
            let friends: BTreeSet<UserId> =
                db.graph().friend_ids(user).unwrap().into_iter().collect();

            let expected: BTreeSet<UserId> =
                followings.intersection(&followers).copied().collect();
            prop_assert_eq!(&friends, &expected);
            prop_assert_eq!(db.graph().count_friends(user).unwrap(), expected.len());
            prop_assert!(!friends.contains(&user));
        }
    }
}

// Property: the edge set never holds a duplicate ordered pair
proptest! {
    #[test]
    fn prop_repeated_follows_leave_one_edge(edges in prop_edge_list(60)) {
        let (db, _, expected) = build(&edges);
        prop_assert_eq!(db.follows().total().unwrap(), expected.len());
    }
}

// Property: a new follow shows up on both sides and bumps each count by one
proptest! {
    #[test]
    fn prop_follow_increments_counts(
        edges in prop_edge_list(30),
        a in 0..USERS,
        b in 0..USERS,
    ) {
        prop_assume!(a != b);
        let (db, ids, existing) = build(&edges);
        prop_assume!(!existing.contains(&(a, b)));
        let (a, b) = (ids[a], ids[b]);

        let followings_before = db.follows().count(RelationKind::Followings, a).unwrap();
        let followers_before = db.follows().count(RelationKind::Followers, b).unwrap();

        prop_assert!(db.follows().follow(a, b).unwrap());

        prop_assert!(db.follows().following_ids(a).unwrap().contains(&b));
        prop_assert!(db.follows().follower_ids(b).unwrap().contains(&a));
        prop_assert_eq!(
            db.follows().count(RelationKind::Followings, a).unwrap(),
            followings_before + 1
        );
        prop_assert_eq!(
            db.follows().count(RelationKind::Followers, b).unwrap(),
            followers_before + 1
        );
    }
}

// Property: toggling twice restores the original state
proptest! {
    #[test]
    fn prop_double_toggle_is_identity(
        edges in prop_edge_list(30),
        a in 0..USERS,
        b in 0..USERS,
    ) {
        prop_assume!(a != b);
        let (db, ids, _) = build(&edges);
        let before = db.follows().is_following(ids[a], ids[b]).unwrap();
        let total = db.follows().total().unwrap();

        let first = db.follows().toggle(ids[a], ids[b]).unwrap();
        prop_assert_eq!(first == EdgeState::Exists, !before);
        let second = db.follows().toggle(ids[a], ids[b]).unwrap();
        prop_assert_eq!(second, first.flipped());

        prop_assert_eq!(db.follows().is_following(ids[a], ids[b]).unwrap(), before);
        prop_assert_eq!(db.follows().total().unwrap(), total);
    }
}

// Property: batched counts equal the per-user counts
proptest! {
    #[test]
    fn prop_with_count_matches_direct_counts(edges in prop_edge_list(40)) {
        let (db, ids, _) = build(&edges);
        let counted = db.graph().with_count(&ids, &RelationKind::ALL).unwrap();

        prop_assert_eq!(counted.len(), ids.len());
        for entry in &counted {
            for kind in RelationKind::ALL {
                let direct = db.follows().count(kind, entry.user.id).unwrap();
                prop_assert_eq!(entry.counts.get(kind), Some(direct));
            }
        }
    }
}

// Property: walking every page yields each status exactly once, newest first
proptest! {
    #[test]
    fn prop_pages_cover_timeline(statuses in 0usize..40, per_page in 1usize..12) {
        let (db, ids) = setup(1);
        for i in 0..statuses {
            db.statuses().post(ids[0], &format!("status {i}")).unwrap();
        }

        let paginator = db.timeline().paginate(ids[0], per_page).unwrap();
        prop_assert_eq!(paginator.total(), statuses);
        prop_assert_eq!(paginator.last_page(), statuses.div_ceil(per_page).max(1));

        let mut seen = Vec::new();
        for page in paginator.pages() {
            let page = page.unwrap();
            prop_assert!(page.len() <= per_page);
            seen.extend(page.items);
        }
        prop_assert_eq!(seen.len(), statuses);
        prop_assert!(seen
            .windows(2)
            .all(|w| (w[0].created_at, w[0].id) > (w[1].created_at, w[1].id)));
    }
}
