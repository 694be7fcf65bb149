// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Small collection and float helpers reused throughout the crate.

use smallvec::SmallVec;
use std::ops::{Add, Mul, Sub};

/// Most faces/vertex-stars touched by the Euler operators are small; avoid
/// heap churn for the common case.
pub type SVec<T> = SmallVec<[T; 4]>;
pub type SVecN<T, const N: usize> = SmallVec<[T; N]>;

pub trait IteratorUtils: Iterator {
    fn collect_svec(self) -> SVec<Self::Item>
    where
        Self: Sized,
    {
        self.collect()
    }
}
impl<T: ?Sized> IteratorUtils for T where T: Iterator {}

pub fn lerp<T>(start: T, end: T, t: f32) -> T
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    start + (end - start) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_midpoint() {
        assert_eq!(lerp(0.0f32, 10.0, 0.5), 5.0);
    }

    #[test]
    fn svec_collects() {
        let v: SVec<i32> = [1, 2, 3].into_iter().collect_svec();
        assert_eq!(&v[..], &[1, 2, 3]);
    }
}
