//! Envelope index over polygon sets
//!
//! Holds only bounding boxes and keys; exact containment is tested against
//! the stored geometry of each candidate.

use geo::BoundingRect;
use geo_types::{Coord, MultiPolygon, Rect};
use rstar::{AABB, RTree, RTreeObject};

/// One indexed bounding box
#[derive(Debug, Clone)]
struct Entry<K> {
    key: K,
    bbox: AABB<[f64; 2]>,
}

impl<K> RTreeObject for Entry<K> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox
    }
}

/// R-tree of polygon-set bounding boxes keyed by `K`
#[derive(Debug)]
pub struct EnvelopeIndex<K> {
    tree: RTree<Entry<K>>,
}

impl<K> Default for EnvelopeIndex<K> {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl<K: Copy + Ord> EnvelopeIndex<K> {
    /// Bulk-load an index; empty polygon sets are skipped
    pub fn build<'a>(items: impl IntoIterator<Item = (K, &'a MultiPolygon<f64>)>) -> Self {
        let entries: Vec<_> = items
            .into_iter()
            .filter_map(|(key, geom)| {
                geom.bounding_rect().map(|rect| Entry {
                    key,
                    bbox: to_aabb(rect),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Add or refresh one entry
    pub fn insert(&mut self, key: K, geom: &MultiPolygon<f64>) {
        self.remove(key);
        if let Some(rect) = geom.bounding_rect() {
            self.tree.insert(Entry {
                key,
                bbox: to_aabb(rect),
            });
        }
    }

    /// Drop every entry for `key`
    pub fn remove(&mut self, key: K) {
        let stale: Vec<_> = self
            .tree
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.bbox)
            .collect();
        for bbox in stale {
            self.tree.remove_with_selection_function(ExactEntry { key, bbox });
        }
    }

    /// Keys whose box contains the point, ascending
    pub fn at_point(&self, c: Coord<f64>) -> Vec<K> {
        let mut keys: Vec<K> = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_point([c.x, c.y]))
            .map(|e| e.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Keys whose box intersects `rect`, ascending
    pub fn intersecting(&self, rect: Rect<f64>) -> Vec<K> {
        let mut keys: Vec<K> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(rect))
            .map(|e| e.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

fn to_aabb(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Selects the one entry with a given key and box
struct ExactEntry<K> {
    key: K,
    bbox: AABB<[f64; 2]>,
}

impl<K: PartialEq> rstar::SelectionFunction<Entry<K>> for ExactEntry<K> {
    fn should_unpack_parent(&self, envelope: &AABB<[f64; 2]>) -> bool {
        rstar::Envelope::contains_envelope(envelope, &self.bbox)
    }

    fn should_unpack_leaf(&self, leaf: &Entry<K>) -> bool {
        leaf.key == self.key && leaf.bbox == self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn test_point_candidates() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 5.0, 10.0);
        let c = square(100.0, 100.0, 1.0);
        let index = EnvelopeIndex::build([(1_i64, &a), (2, &b), (3, &c)]);

        assert_eq!(index.len(), 3);
        assert_eq!(index.at_point(Coord { x: 7.0, y: 7.0 }), vec![1, 2]);
        assert_eq!(index.at_point(Coord { x: 1.0, y: 1.0 }), vec![1]);
        assert!(index.at_point(Coord { x: 50.0, y: 50.0 }).is_empty());
    }

    #[test]
    fn test_rect_candidates() {
        let a = square(0.0, 0.0, 10.0);
        let c = square(100.0, 100.0, 1.0);
        let index = EnvelopeIndex::build([(1_i64, &a), (3, &c)]);

        let hits = index.intersecting(Rect::new(Coord { x: 90.0, y: 90.0 }, Coord { x: 200.0, y: 200.0 }));
        assert_eq!(hits, vec![3]);
    }

    #[test]
    fn test_insert_replaces_entry() {
        let mut index = EnvelopeIndex::build([(1_i64, &square(0.0, 0.0, 1.0))]);
        index.insert(1, &square(50.0, 50.0, 1.0));

        assert_eq!(index.len(), 1);
        assert!(index.at_point(Coord { x: 0.5, y: 0.5 }).is_empty());
        assert_eq!(index.at_point(Coord { x: 50.5, y: 50.5 }), vec![1]);
    }
}
