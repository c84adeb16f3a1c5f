//! Polygon cardinality normalisation and topology repair
//!
//! Source polygons are hand-traced and a small share of them self-intersect
//! or carry duplicate vertices. Repair keeps everything recoverable and only
//! rejects geometry with no area left once cleaned.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Area, BooleanOps};
use geo_types::{Coord, Geometry, Line, LineString, MultiPolygon, Polygon};
use tracing::trace;

use crate::error::SpatialError;

/// Result of [`repair`]
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    /// Valid polygon set
    pub geometry: MultiPolygon<f64>,
    /// Whether anything had to change
    pub repaired: bool,
}

/// Reduce any geometry to its polygonal parts, as a polygon set
///
/// A single polygon is wrapped, a polygon set passes through, and a
/// collection keeps only its polygonal members.
pub fn polygonal_parts(geom: Geometry<f64>) -> Result<MultiPolygon<f64>, SpatialError> {
    let kind = geometry_kind(&geom);
    let mut polygons = Vec::new();
    collect_polygons(geom, &mut polygons);
    if polygons.is_empty() {
        return Err(SpatialError::NonPolygonal(kind));
    }
    Ok(MultiPolygon::new(polygons))
}

fn collect_polygons(geom: Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geom {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                collect_polygons(g, out);
            }
        }
        Geometry::Point(_)
        | Geometry::Line(_)
        | Geometry::LineString(_)
        | Geometry::MultiPoint(_)
        | Geometry::MultiLineString(_) => {}
    }
}

fn geometry_kind(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Repair a polygon set into a valid one
///
/// Rings are cleaned (non-finite vertices rejected, consecutive duplicates
/// dropped, rings closed, rings with fewer than three distinct vertices
/// discarded). If the cleaned set is still invalid (crossing rings, a hole
/// outside its shell, nested holes, or overlapping members) it is rebuilt
/// with boolean operations. Polygons with zero area are dropped; an empty
/// result is degenerate.
pub fn repair(geom: &MultiPolygon<f64>) -> Result<Repaired, SpatialError> {
    let mut changed = false;
    let mut polygons = Vec::with_capacity(geom.0.len());

    for polygon in &geom.0 {
        let Some(exterior) = clean_ring(polygon.exterior(), &mut changed)? else {
            changed = true;
            continue;
        };
        let mut interiors = Vec::with_capacity(polygon.interiors().len());
        for ring in polygon.interiors() {
            match clean_ring(ring, &mut changed)? {
                Some(ring) => interiors.push(ring),
                None => changed = true,
            }
        }
        polygons.push(Polygon::new(exterior, interiors));
    }

    let mut cleaned = MultiPolygon::new(polygons);
    if has_self_intersections(&cleaned) || has_misplaced_rings(&cleaned) {
        trace!(polygons = cleaned.0.len(), "Rebuilding invalid polygon set");
        cleaned = rebuild(cleaned);
        changed = true;
    }

    let before = cleaned.0.len();
    cleaned.0.retain(|p| p.unsigned_area() > 0.0);
    if cleaned.0.len() != before {
        changed = true;
    }

    if cleaned.0.is_empty() {
        return Err(SpatialError::degenerate("no area remains after repair"));
    }

    Ok(Repaired {
        geometry: cleaned,
        repaired: changed,
    })
}

/// Rebuild a polygon set as the union of each shell minus its holes
///
/// Each ring is filled on its own, so a crossing ring splits into faces, and
/// holes only ever remove area from their own shell.
fn rebuild(geom: MultiPolygon<f64>) -> MultiPolygon<f64> {
    let mut result = MultiPolygon::new(Vec::new());
    for polygon in geom.0 {
        let (exterior, interiors) = polygon.into_inner();
        let mut face = MultiPolygon::new(vec![Polygon::new(exterior, Vec::new())]);
        if !interiors.is_empty() {
            let mut holes = MultiPolygon::new(Vec::new());
            for ring in interiors {
                holes = holes.union(&MultiPolygon::new(vec![Polygon::new(ring, Vec::new())]));
            }
            face = face.difference(&holes);
        }
        result = result.union(&face);
    }
    result
}

fn clean_ring(
    ring: &LineString<f64>,
    changed: &mut bool,
) -> Result<Option<LineString<f64>>, SpatialError> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len() + 1);
    for c in &ring.0 {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(SpatialError::degenerate("ring contains a non-finite vertex"));
        }
        if coords.last() == Some(c) {
            *changed = true;
            continue;
        }
        coords.push(*c);
    }

    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    } else if !coords.is_empty() && ring.0.first() != ring.0.last() {
        *changed = true;
    }

    if coords.len() < 3 || is_collinear(&coords) {
        return Ok(None);
    }

    coords.push(coords[0]);
    Ok(Some(LineString::new(coords)))
}

/// Whether every vertex lies on the line through the first two
fn is_collinear(coords: &[Coord<f64>]) -> bool {
    let (a, b) = (coords[0], coords[1]);
    coords[2..].iter().all(|c| {
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        cross == 0.0
    })
}

/// One ring segment, tagged with where it came from
struct Segment {
    line: Line<f64>,
    polygon: usize,
    ring: usize,
    index: usize,
    ring_len: usize,
}

impl Segment {
    fn min_x(&self) -> f64 {
        self.line.start.x.min(self.line.end.x)
    }

    fn max_x(&self) -> f64 {
        self.line.start.x.max(self.line.end.x)
    }

    fn y_overlaps(&self, other: &Segment) -> bool {
        let (a0, a1) = minmax(self.line.start.y, self.line.end.y);
        let (b0, b1) = minmax(other.line.start.y, other.line.end.y);
        a0 <= b1 && b0 <= a1
    }

    fn is_adjacent(&self, other: &Segment) -> bool {
        if self.polygon != other.polygon || self.ring != other.ring {
            return false;
        }
        let (i, j) = minmax_usize(self.index, other.index);
        j == i + 1 || (i == 0 && j == self.ring_len - 1)
    }
}

fn minmax(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

fn minmax_usize(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Whether any two ring segments cross or overlap
///
/// Segments are swept in x order so only overlapping spans are compared.
/// Rings of one polygon may touch at a single point; a ring may not touch
/// itself, and separate polygons may not cross.
fn has_self_intersections(geom: &MultiPolygon<f64>) -> bool {
    let mut segments = Vec::new();
    for (p, polygon) in geom.0.iter().enumerate() {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for (r, ring) in rings.enumerate() {
            let ring_len = ring.0.len().saturating_sub(1);
            for (index, line) in ring.lines().enumerate() {
                segments.push(Segment {
                    line,
                    polygon: p,
                    ring: r,
                    index,
                    ring_len,
                });
            }
        }
    }

    segments.sort_by(|a, b| a.min_x().total_cmp(&b.min_x()));

    for (i, a) in segments.iter().enumerate() {
        for b in &segments[i + 1..] {
            if b.min_x() > a.max_x() {
                break;
            }
            if !a.y_overlaps(b) {
                continue;
            }
            let Some(hit) = line_intersection(a.line, b.line) else {
                continue;
            };
            let conflict = match hit {
                LineIntersection::Collinear { .. } => true,
                LineIntersection::SinglePoint { is_proper, .. } => {
                    if a.is_adjacent(b) {
                        false
                    } else if a.polygon == b.polygon && a.ring == b.ring {
                        true
                    } else {
                        is_proper
                    }
                }
            };
            if conflict {
                return true;
            }
        }
    }
    false
}

/// Whether any ring sits where it may not
///
/// Assumes no two rings cross, so a ring is either inside or outside another
/// and one off-boundary sample decides. A hole must lie inside its shell,
/// holes of one polygon may not nest, and no member may lie inside another
/// (a member inside another member's hole is fine).
fn has_misplaced_rings(geom: &MultiPolygon<f64>) -> bool {
    for polygon in &geom.0 {
        let shell = Polygon::new(polygon.exterior().clone(), Vec::new());
        let holes: Vec<Polygon<f64>> = polygon
            .interiors()
            .iter()
            .map(|ring| Polygon::new(ring.clone(), Vec::new()))
            .collect();

        for hole in &holes {
            if matches!(ring_position(hole.exterior(), &shell), Some(CoordPos::Outside)) {
                return true;
            }
        }
        if any_pair_nested(&holes) {
            return true;
        }
    }
    any_pair_nested(&geom.0)
}

fn any_pair_nested(polygons: &[Polygon<f64>]) -> bool {
    polygons.iter().enumerate().any(|(i, a)| {
        polygons[i + 1..].iter().any(|b| {
            ring_position(b.exterior(), a) == Some(CoordPos::Inside)
                || ring_position(a.exterior(), b) == Some(CoordPos::Inside)
        })
    })
}

/// Position of a ring relative to a polygon, from its first vertex or edge
/// midpoint not on the polygon's boundary
fn ring_position(ring: &LineString<f64>, polygon: &Polygon<f64>) -> Option<CoordPos> {
    let midpoints = ring.lines().map(|l| Coord {
        x: (l.start.x + l.end.x) / 2.0,
        y: (l.start.y + l.end.y) / 2.0,
    });
    ring.0
        .iter()
        .copied()
        .chain(midpoints)
        .map(|c| polygon.coordinate_position(&c))
        .find(|pos| *pos != CoordPos::OnBoundary)
}
