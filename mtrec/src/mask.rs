//! # Foreground mask processing

use crate::prelude::v1::*;

/// Value of a set pixel in a binarized mask.
pub const FOREGROUND: u8 = 255;

/// Offsets covered by the 3x3 elliptic structuring element.
///
/// At this size the ellipse degenerates into a cross.
const ELLIPSE_3X3: [(isize, isize); 5] = [(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1)];

/// Offsets of the 4-connected neighbourhood.
const NEIGHBORS_4: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Offsets of the 8-connected neighbourhood.
const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Clone, Copy)]
enum Morph {
    Erode,
    Dilate,
}

/// Per-pixel foreground likelihood produced by a background model.
///
/// Values are stored in row-major order. Any non-zero value counts as foreground once the mask
/// has been binarized with [`threshold`](ForegroundMask::threshold).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForegroundMask {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

/// Axis-aligned box enclosing a region, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct BoundingBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Connected set of foreground pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct Region {
    pub bbox: BoundingBox,
    /// Number of pixels in the region.
    pub area: usize,
}

impl ForegroundMask {
    /// Create an empty (all background) mask.
    ///
    /// # Arguments
    ///
    /// * `width` - width of the mask.
    /// * `height` - height of the mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0; width * height],
            width,
            height,
        }
    }

    /// Wrap raw row-major mask values.
    ///
    /// Fails if `data` does not hold exactly `width * height` values.
    pub fn from_vec(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        ensure!(
            data.len() == width * height,
            "mask of {}x{} needs {} values, got {}",
            width,
            height,
            width * height,
            data.len()
        );

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();

        Self {
            data,
            width,
            height,
        }
    }

    /// Get width and height of the mask.
    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the number of pixels in the mask.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Get the mask values in row-major order.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get the value at given coordinates.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[self.width * y + x]
    }

    /// Set the value at given coordinates.
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[self.width * y + x] = value;
    }

    /// Count the pixels that are not background.
    pub fn foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Binarize the mask.
    ///
    /// Values strictly above `thresh` become [`FOREGROUND`], everything else becomes background.
    /// Background models mark shadows with mid-range values, so a high threshold drops them
    /// together with low-confidence noise.
    pub fn threshold(&self, thresh: u8) -> Self {
        Self {
            data: self
                .data
                .iter()
                .map(|&v| if v > thresh { FOREGROUND } else { 0 })
                .collect(),
            ..*self
        }
    }

    /// Erode the mask with the 3x3 elliptic structuring element.
    ///
    /// Pixels outside the mask do not count as background, so regions touching the border are
    /// not eaten away from that side.
    pub fn erode(&self) -> Self {
        self.morph(Morph::Erode)
    }

    /// Dilate the mask with the 3x3 elliptic structuring element.
    pub fn dilate(&self) -> Self {
        self.morph(Morph::Dilate)
    }

    /// Morphological opening: erosion followed by dilation.
    ///
    /// Removes isolated speckles and thin protrusions while keeping the shape of larger regions.
    pub fn open(&self) -> Self {
        self.erode().dilate()
    }

    fn morph(&self, op: Morph) -> Self {
        let dim = self.dim();

        let data = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let mut covered =
                    neighbors(dim, x, y, &ELLIPSE_3X3).map(|(x, y)| self.get(x, y) != 0);
                let set = match op {
                    Morph::Erode => covered.all(|v| v),
                    Morph::Dilate => covered.any(|v| v),
                };
                if set {
                    FOREGROUND
                } else {
                    0
                }
            })
            .collect();

        Self { data, ..*self }
    }

    /// Extract the foreground regions delimited by their external boundary.
    ///
    /// Regions are 8-connected and returned in scan order of their first pixel. Background that
    /// is enclosed by a region counts towards its area, and anything inside such a hole belongs to
    /// the enclosing region instead of being reported on its own.
    pub fn regions(&self) -> Vec<Region> {
        let dim = self.dim();
        let filled = self.enclosed();
        let mut visited = vec![false; self.size()];
        let mut regions = vec![];

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = self.width * y + x;

                if !filled[idx] || visited[idx] {
                    continue;
                }

                visited[idx] = true;
                let mut to_fill = vec![(x, y)];

                let mut area = 0;
                let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

                while let Some((x, y)) = to_fill.pop() {
                    area += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);

                    for (x, y) in neighbors(dim, x, y, &NEIGHBORS_8) {
                        let idx = self.width * y + x;
                        if filled[idx] && !visited[idx] {
                            visited[idx] = true;
                            to_fill.push((x, y));
                        }
                    }
                }

                regions.push(Region {
                    bbox: BoundingBox {
                        x: min_x,
                        y: min_y,
                        width: max_x - min_x + 1,
                        height: max_y - min_y + 1,
                    },
                    area,
                });
            }
        }

        regions
    }

    /// Mark foreground pixels together with the background they enclose.
    ///
    /// Background is flooded from the mask border with 4-connectivity, the complement of the
    /// 8-connected foreground. Whatever the flood can not reach lies in a hole.
    fn enclosed(&self) -> Vec<bool> {
        let dim = self.dim();
        let mut outside = vec![false; self.size()];

        let mut to_fill = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height)
            .filter(|&(x, y)| self.get(x, y) == 0)
            .collect::<Vec<_>>();

        for &(x, y) in &to_fill {
            outside[self.width * y + x] = true;
        }

        while let Some((x, y)) = to_fill.pop() {
            for (x, y) in neighbors(dim, x, y, &NEIGHBORS_4) {
                let idx = self.width * y + x;
                if self.data[idx] == 0 && !outside[idx] {
                    outside[idx] = true;
                    to_fill.push((x, y));
                }
            }
        }

        outside.into_iter().map(|o| !o).collect()
    }
}

/// Iterate the in-bounds pixels at `offsets` around `(x, y)`.
fn neighbors(
    (width, height): (usize, usize),
    x: usize,
    y: usize,
    offsets: &[(isize, isize)],
) -> impl Iterator<Item = (usize, usize)> + '_ {
    offsets
        .iter()
        .map(move |&(ox, oy)| (x as isize + ox, y as isize + oy))
        .filter(move |&(x, y)| {
            (0..width as isize).contains(&x) && (0..height as isize).contains(&y)
        })
        .map(|(x, y)| (x as usize, y as usize))
}
