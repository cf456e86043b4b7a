//! Shared math utilities for detection infrastructure.
//!
//! Provides union-find clustering and the rectangle similarity predicate
//! used to merge raw cascade hits into faces.

use crate::shared::face_box::FaceBox;

/// Find root of element `i` with path halving for amortized near-O(1).
pub fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
pub fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

/// Two boxes are similar when every edge differs by at most
/// `eps * (min width + min height) / 2`.
pub fn similar_boxes(a: &FaceBox, b: &FaceBox, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) as f64 + a.height.min(b.height) as f64) * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x) && close(a.y, b.y) && close(a.right(), b.right()) && close(a.bottom(), b.bottom())
}

/// Partition boxes into transitive similarity clusters.
///
/// Returns clusters as lists of indices into `boxes`, ordered by their
/// first member so output follows scan order.
pub fn cluster_boxes(boxes: &[FaceBox], eps: f64) -> Vec<Vec<usize>> {
    let n = boxes.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar_boxes(&boxes[i], &boxes[j], eps) {
                union(&mut parent, i, j);
            }
        }
    }

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut root_slot: std::collections::HashMap<usize, usize> =
        std::collections::HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        let slot = *root_slot.entry(root).or_insert_with(|| {
            clusters.push(Vec::new());
            clusters.len() - 1
        });
        clusters[slot].push(i);
    }
    clusters
}
