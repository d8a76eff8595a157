// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Doors, windows and the wall regions they carve
//!
//! [`resolve_openings`] splits a wall footprint into the free wall face and
//! a partition of opening-covered regions, each tagged with the set of
//! openings covering it, then stacks the horizontal wall bands that remain
//! visible below, between and above those openings.

use crate::area::Area;
use crate::elevation::ElevationFunction;
use crate::polygon::rotated_rectangle;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Regions smaller than this are boolean-operation noise
pub const MIN_REGION_AREA: f64 = 1e-6;

/// Stable identifier of an opening, assigned by the owner of the floor plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpeningId(pub u64);

/// Set of openings covering one region, sorted by id
pub type OpeningSet = SmallVec<[OpeningId; 4]>;

/// Reference to the 3D model of a door or window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Resource the model loader resolves
    pub uri: String,
    /// Row-major rotation applied to the model before it is placed
    #[serde(default = "identity_rotation")]
    pub rotation: [[f64; 3]; 3],
}

fn identity_rotation() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

impl ModelRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            rotation: identity_rotation(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A door or window placed in the floor plan
///
/// `(x, y)` is the center of its footprint; `width` runs along `angle` and
/// `depth` across it. `elevation` is the sill height above the floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    #[serde(default)]
    pub elevation: f64,
    /// Whether the opening carves the whole wall thickness whatever its depth
    #[serde(default = "default_true")]
    pub cuts_through: bool,
    #[serde(default)]
    pub model: Option<ModelRef>,
    /// Front silhouette in normalized `[-0.5, 0.5]²` space; replaces the
    /// silhouette of `model` when set
    #[serde(default)]
    pub cut_out_shape: Option<Area>,
}

impl Opening {
    pub fn new(x: f64, y: f64, angle: f64, width: f64, depth: f64, height: f64, elevation: f64) -> Self {
        Self {
            x,
            y,
            angle,
            width,
            depth,
            height,
            elevation,
            cuts_through: true,
            model: None,
            cut_out_shape: None,
        }
    }

    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_cut_out_shape(mut self, shape: Area) -> Self {
        self.cut_out_shape = Some(shape);
        self
    }

    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Top of the opening above the floor
    #[inline]
    pub fn top(&self) -> f64 {
        self.elevation + self.height
    }

    /// Footprint corners, counter-clockwise
    pub fn points(&self) -> Vec<Point2<f64>> {
        rotated_rectangle(self.x, self.y, self.width, self.depth, self.angle)
    }

    pub fn footprint(&self) -> Area {
        self.footprint_with_depth(self.depth)
    }

    /// Footprint stretched (never shrunk) to `depth` across the opening
    pub fn footprint_with_depth(&self, depth: f64) -> Area {
        Area::from_polygon(&rotated_rectangle(
            self.x,
            self.y,
            self.width,
            self.depth.max(depth),
            self.angle,
        ))
    }

    /// Cut this opening makes in a wall of the given thickness
    pub fn cut(&self, id: OpeningId, wall_thickness: f64) -> OpeningCut {
        let footprint = if self.cuts_through {
            // Enough depth to cross the wall wherever the opening sits in it
            self.footprint_with_depth(self.depth + 2.0 * wall_thickness)
        } else {
            self.footprint()
        };
        OpeningCut {
            id,
            footprint,
            elevation: self.elevation,
            height: self.height,
        }
    }
}

/// Footprint and vertical extent of one opening as seen by a wall
#[derive(Debug, Clone)]
pub struct OpeningCut {
    pub id: OpeningId,
    pub footprint: Area,
    pub elevation: f64,
    pub height: f64,
}

impl OpeningCut {
    #[inline]
    pub fn top(&self) -> f64 {
        self.elevation + self.height
    }
}

/// Vertical range of the face being carved: a flat bottom and a top line,
/// optionally capped by a flat height (baseboards)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalSpan {
    pub bottom: f64,
    pub top: ElevationFunction,
    pub cap: Option<f64>,
}

impl VerticalSpan {
    pub fn new(bottom: f64, top: ElevationFunction) -> Self {
        Self { bottom, top, cap: None }
    }

    pub fn capped(bottom: f64, top: ElevationFunction, cap: f64) -> Self {
        Self {
            bottom,
            top,
            cap: Some(cap),
        }
    }

    /// Top elevation at `p`, cap included
    pub fn top_at(&self, p: &Point2<f64>) -> f64 {
        let top = self.top.at(p);
        self.cap.map_or(top, |cap| cap.min(top))
    }
}

/// Part of the footprint covered by one set of openings
#[derive(Debug, Clone)]
pub struct OpeningRegion {
    pub area: Area,
    pub openings: OpeningSet,
}

/// Where a band sits relative to the openings of its region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandKind {
    /// Under the lowest sill
    Below,
    /// In the gap between two stacked openings
    Between,
    /// Over the highest opening
    Above,
}

/// Vertical wall slice between a flat bottom and a top line, over `area`
#[derive(Debug, Clone)]
pub struct WallFaceBand {
    pub kind: BandKind,
    pub area: Area,
    pub bottom: f64,
    pub top: ElevationFunction,
    pub cap: Option<f64>,
    /// Openings of the region the band belongs to
    pub openings: OpeningSet,
}

impl WallFaceBand {
    /// Top elevation at `p`, cap included
    pub fn top_at(&self, p: &Point2<f64>) -> f64 {
        let top = self.top.at(p);
        self.cap.map_or(top, |cap| cap.min(top))
    }
}

/// Result of carving openings out of a footprint
#[derive(Debug, Clone, Default)]
pub struct ResolvedOpenings {
    /// Footprint not covered by any opening; spans the full height
    pub wall_face: Area,
    /// Disjoint opening-covered regions
    pub regions: Vec<OpeningRegion>,
    /// Bands in region order, each region emitting below, gaps, above
    pub bands: Vec<WallFaceBand>,
}

impl ResolvedOpenings {
    /// Region covered by openings
    pub fn covered(&self) -> Area {
        self.regions
            .iter()
            .fold(Area::new(), |acc, region| acc.union(&region.area))
    }
}

/// Carve `cuts` out of `footprint` and stack the bands left around them
pub fn resolve_openings(footprint: &Area, cuts: &[OpeningCut], span: &VerticalSpan) -> ResolvedOpenings {
    let mut wall_face = footprint.clone();
    // Regions reference cuts by index until the end
    let mut regions: Vec<(Area, SmallVec<[usize; 4]>)> = Vec::new();

    for (index, cut) in cuts.iter().enumerate() {
        if cut.height <= 0.0 {
            continue;
        }
        let intersection = footprint.intersect(&cut.footprint);
        if intersection.area() < MIN_REGION_AREA {
            continue;
        }
        if !overlaps_vertically(&intersection, cut, span) {
            continue;
        }
        wall_face = wall_face.subtract(&intersection);

        // Split every existing region against the new one
        let mut remainder = intersection.clone();
        let mut shared_regions = Vec::new();
        for (area, members) in regions.iter_mut() {
            let shared = area.intersect(&intersection);
            if shared.area() < MIN_REGION_AREA {
                continue;
            }
            *area = area.subtract(&shared);
            remainder = remainder.subtract(&shared);
            let mut merged = members.clone();
            merged.push(index);
            shared_regions.push((shared, merged));
        }
        regions.extend(shared_regions);
        if remainder.area() >= MIN_REGION_AREA {
            regions.push((remainder, SmallVec::from_elem(index, 1)));
        }
        regions.retain(|(area, _)| area.area() >= MIN_REGION_AREA);
    }

    let mut bands = Vec::new();
    let regions: Vec<OpeningRegion> = regions
        .into_iter()
        .map(|(area, members)| {
            stack_bands(&area, &members, cuts, span, &mut bands);
            let mut openings: OpeningSet = members.iter().map(|&i| cuts[i].id).collect();
            openings.sort();
            openings.dedup();
            OpeningRegion { area, openings }
        })
        .collect();

    ResolvedOpenings {
        wall_face,
        regions,
        bands,
    }
}

fn overlaps_vertically(intersection: &Area, cut: &OpeningCut, span: &VerticalSpan) -> bool {
    let highest = intersection
        .islands()
        .iter()
        .flat_map(|island| island.outer.iter())
        .map(|p| span.top_at(p))
        .fold(f64::NEG_INFINITY, f64::max);
    cut.elevation < highest && cut.top() > span.bottom
}

/// Push the bands of one region: below the lowest sill, in every genuine
/// gap between stacked openings, above the highest top
fn stack_bands(
    area: &Area,
    members: &[usize],
    cuts: &[OpeningCut],
    span: &VerticalSpan,
    bands: &mut Vec<WallFaceBand>,
) {
    let mut sorted: SmallVec<[usize; 4]> = members.iter().copied().collect();
    sorted.sort_by(|a, b| cuts[*a].elevation.total_cmp(&cuts[*b].elevation));
    let mut openings: OpeningSet = sorted.iter().map(|&i| cuts[i].id).collect();
    openings.sort();
    openings.dedup();

    let Some(&lowest) = sorted.first() else {
        return;
    };
    let cap_with = |limit: f64| Some(span.cap.map_or(limit, |cap| cap.min(limit)));

    if cuts[lowest].elevation > span.bottom {
        push_band(bands, BandKind::Below, area, span.bottom, span, cap_with(cuts[lowest].elevation), &openings);
    }

    let n = sorted.len();
    let mut i = 0;
    while i + 1 < n {
        let lower_top = cuts[sorted[i]].top();
        i += 1;
        let mut higher = sorted[i];
        // Skip openings ending under the lower one's top
        loop {
            if lower_top < cuts[higher].top() {
                break;
            }
            i += 1;
            if i >= n {
                break;
            }
            higher = sorted[i];
        }
        if i < n && lower_top < cuts[higher].elevation {
            push_band(bands, BandKind::Between, area, lower_top, span, cap_with(cuts[higher].elevation), &openings);
        }
    }

    let highest_top = sorted
        .iter()
        .map(|&i| cuts[i].top())
        .fold(f64::NEG_INFINITY, f64::max);
    push_band(bands, BandKind::Above, area, highest_top, span, span.cap, &openings);
}

fn push_band(
    bands: &mut Vec<WallFaceBand>,
    kind: BandKind,
    area: &Area,
    bottom: f64,
    span: &VerticalSpan,
    cap: Option<f64>,
    openings: &OpeningSet,
) {
    if cap.is_some_and(|cap| cap <= bottom) {
        return;
    }
    let area = if span.top.is_flat() {
        if span.top.beta <= bottom {
            return;
        }
        area.clone()
    } else {
        // Keep only the part where the sloped top passes over the bottom
        let Some(bounds) = area.bounds() else {
            return;
        };
        area.intersect(&span.top.region_above(bottom, bounds))
    };
    if area.area() < MIN_REGION_AREA {
        return;
    }
    bands.push(WallFaceBand {
        kind,
        area,
        bottom,
        top: span.top,
        cap,
        openings: openings.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::WallFrame;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Area {
        Area::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    fn cut(id: u64, x0: f64, x1: f64, elevation: f64, height: f64) -> OpeningCut {
        OpeningCut {
            id: OpeningId(id),
            footprint: rect(x0, -20.0, x1, 20.0),
            elevation,
            height,
        }
    }

    fn wall() -> Area {
        rect(0.0, -5.0, 400.0, 5.0)
    }

    fn flat_span() -> VerticalSpan {
        VerticalSpan::new(0.0, ElevationFunction::flat(250.0))
    }

    #[test]
    fn test_no_openings() {
        let resolved = resolve_openings(&wall(), &[], &flat_span());
        assert!(resolved.regions.is_empty());
        assert!(resolved.bands.is_empty());
        assert_relative_eq!(resolved.wall_face.area(), 4000.0);
    }

    #[test]
    fn test_single_window_three_sides() {
        let resolved = resolve_openings(&wall(), &[cut(1, 100.0, 200.0, 90.0, 120.0)], &flat_span());
        assert_eq!(resolved.regions.len(), 1);
        assert_relative_eq!(resolved.wall_face.area(), 3000.0, epsilon = 1e-3);

        let kinds: Vec<_> = resolved.bands.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BandKind::Below, BandKind::Above]);
        assert_relative_eq!(resolved.bands[0].top_at(&Point2::new(150.0, 0.0)), 90.0);
        assert_relative_eq!(resolved.bands[1].bottom, 210.0);
    }

    #[test]
    fn test_door_covering_wall() {
        let resolved = resolve_openings(&wall(), &[cut(1, -10.0, 410.0, 0.0, 250.0)], &flat_span());
        assert!(resolved.bands.is_empty());
        assert!(resolved.wall_face.is_empty());
    }

    #[test]
    fn test_opening_above_wall_ignored() {
        let resolved = resolve_openings(&wall(), &[cut(1, 100.0, 200.0, 260.0, 50.0)], &flat_span());
        assert!(resolved.regions.is_empty());
        assert_relative_eq!(resolved.wall_face.area(), 4000.0);
    }

    #[test]
    fn test_stacked_windows_gap() {
        let cuts = [cut(2, 100.0, 200.0, 150.0, 60.0), cut(1, 100.0, 200.0, 20.0, 80.0)];
        let resolved = resolve_openings(&wall(), &cuts, &flat_span());

        assert_eq!(resolved.regions.len(), 1);
        assert_eq!(resolved.regions[0].openings.as_slice(), &[OpeningId(1), OpeningId(2)]);
        let kinds: Vec<_> = resolved.bands.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BandKind::Below, BandKind::Between, BandKind::Above]);
        let between = &resolved.bands[1];
        assert_relative_eq!(between.bottom, 100.0);
        assert_relative_eq!(between.top_at(&Point2::new(150.0, 0.0)), 150.0);
    }

    #[test]
    fn test_stacked_windows_touching_have_no_gap() {
        let cuts = [cut(1, 100.0, 200.0, 20.0, 80.0), cut(2, 100.0, 200.0, 100.0, 60.0)];
        let resolved = resolve_openings(&wall(), &cuts, &flat_span());
        let kinds: Vec<_> = resolved.bands.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BandKind::Below, BandKind::Above]);
    }

    #[test]
    fn test_higher_window_inside_lower_is_skipped() {
        // Second opening ends under the first one's top
        let cuts = [
            cut(1, 100.0, 200.0, 10.0, 150.0),
            cut(2, 100.0, 200.0, 30.0, 40.0),
            cut(3, 100.0, 200.0, 200.0, 20.0),
        ];
        let resolved = resolve_openings(&wall(), &cuts, &flat_span());
        let between: Vec<_> = resolved
            .bands
            .iter()
            .filter(|b| b.kind == BandKind::Between)
            .collect();
        assert_eq!(between.len(), 1);
        assert_relative_eq!(between[0].bottom, 160.0);
        assert_relative_eq!(between[0].cap.unwrap(), 200.0);
    }

    #[test]
    fn test_overlapping_openings_partition() {
        let cuts = [cut(1, 100.0, 200.0, 0.0, 200.0), cut(2, 150.0, 250.0, 100.0, 50.0)];
        let resolved = resolve_openings(&wall(), &cuts, &flat_span());

        assert_eq!(resolved.regions.len(), 3);
        let shared = resolved
            .regions
            .iter()
            .find(|r| r.openings.len() == 2)
            .unwrap();
        assert_relative_eq!(shared.area.area(), 500.0, epsilon = 1e-3);

        let total = resolved.wall_face.area() + resolved.regions.iter().map(|r| r.area.area()).sum::<f64>();
        assert_relative_eq!(total, 4000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_sloped_top_clips_above_band() {
        // Top runs from 200 at x=0 to 300 at x=400
        let top = ElevationFunction::between(WallFrame::straight(0.0), 0.0, 200.0, 400.0, 300.0);
        let span = VerticalSpan::new(0.0, top);
        // Window top at 240 sits above the wall top for x < 160
        let resolved = resolve_openings(&wall(), &[cut(1, 100.0, 200.0, 50.0, 190.0)], &span);
        let above = resolved
            .bands
            .iter()
            .find(|b| b.kind == BandKind::Above)
            .unwrap();
        let (min, max) = above.area.bounds().unwrap();
        assert_relative_eq!(min.x, 160.0, epsilon = 1e-3);
        assert_relative_eq!(max.x, 200.0, epsilon = 1e-3);
    }

    #[test]
    fn test_capped_span() {
        let span = VerticalSpan::capped(0.0, ElevationFunction::flat(250.0), 10.0);
        // Door from the floor: nothing of the baseboard remains above it
        let resolved = resolve_openings(&wall(), &[cut(1, 100.0, 200.0, 0.0, 210.0)], &span);
        assert!(resolved.bands.is_empty());
        // Window above the baseboard does not touch it
        let resolved = resolve_openings(&wall(), &[cut(1, 100.0, 200.0, 90.0, 120.0)], &span);
        assert!(resolved.regions.is_empty());
    }
}
