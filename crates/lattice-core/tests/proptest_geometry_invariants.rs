//! Property-based invariant tests for geometry primitives.
//!
//! 1. Intersection is commutative and fits within both inputs.
//! 2. Union contains both inputs.
//! 3. Inner padding never grows a rectangle.
//! 4. Right/bottom edges agree with origin + extent.

use lattice_core::geometry::{Point, Rect, Sides};
use proptest::prelude::*;

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (-500i32..=500, -500i32..=500, 0u32..=500, 0u32..=500)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn sides_strategy() -> impl Strategy<Value = Sides> {
    (0u32..=300, 0u32..=300, 0u32..=300, 0u32..=300)
        .prop_map(|(t, r, b, l)| Sides::new(t, r, b, l))
}

proptest! {
    #[test]
    fn intersection_commutative(a in rect_strategy(), b in rect_strategy()) {
        prop_assert_eq!(a.intersection(&b), b.intersection(&a));
    }

    #[test]
    fn intersection_within_inputs(a in rect_strategy(), b in rect_strategy()) {
        if let Some(i) = a.intersection_opt(&b) {
            prop_assert!(i.x >= a.x && i.x >= b.x);
            prop_assert!(i.right() <= a.right() && i.right() <= b.right());
            prop_assert!(i.bottom() <= a.bottom() && i.bottom() <= b.bottom());
        }
    }

    #[test]
    fn union_contains_inputs(a in rect_strategy(), b in rect_strategy()) {
        let u = a.union(&b);
        for r in [a, b] {
            prop_assert!(u.x <= r.x && u.y <= r.y);
            prop_assert!(u.right() >= r.right() && u.bottom() >= r.bottom());
        }
    }

    #[test]
    fn inner_never_grows(r in rect_strategy(), pad in sides_strategy()) {
        let inner = r.inner(pad);
        prop_assert!(inner.width <= r.width);
        prop_assert!(inner.height <= r.height);
    }

    #[test]
    fn edges_agree_with_extent(r in rect_strategy()) {
        prop_assert_eq!(i64::from(r.right()), i64::from(r.x) + i64::from(r.width));
        prop_assert_eq!(i64::from(r.bottom()), i64::from(r.y) + i64::from(r.height));
        if !r.is_empty() {
            prop_assert!(r.contains(Point::new(r.x, r.y)));
        }
    }
}
