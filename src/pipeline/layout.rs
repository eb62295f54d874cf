//! Layout-block detection heuristics.

use image::GrayImage;
use uuid::Uuid;

use crate::document::BlockType;

/// One candidate block found on a page, in page coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRegion {
    pub id: String,
    /// x, y, w, h
    pub bbox: [u32; 4],
    pub kind: BlockType,
}

/// Pure page-to-regions analysis step. A full layout model plugs in behind
/// this trait; the baseline below only needs the binarized bitmap.
pub trait LayoutAnalyzer: Send + Sync {
    fn analyze(&self, image: &GrayImage) -> Vec<LayoutRegion>;
}

/// Lightweight block detector based on horizontal ink projection: contiguous
/// bands of rows containing ink become paragraph regions. Pages where nothing
/// clears the area filter fall back to one full-page block so recognition
/// always has something to chew on.
pub struct SimpleLayoutAnalyzer {
    /// Regions smaller than this many pixels are discarded as specks
    pub min_area: u32,
    /// Blank rows tolerated inside one band before it is split
    pub max_row_gap: u32,
}

impl Default for SimpleLayoutAnalyzer {
    fn default() -> Self {
        Self {
            min_area: 400,
            max_row_gap: 2,
        }
    }
}

impl SimpleLayoutAnalyzer {
    fn ink_rows(image: &GrayImage) -> Vec<bool> {
        (0..image.height())
            .map(|y| (0..image.width()).any(|x| image.get_pixel(x, y).0[0] < 128))
            .collect()
    }

    fn band_bbox(image: &GrayImage, top: u32, bottom: u32) -> Option<[u32; 4]> {
        let mut min_x = u32::MAX;
        let mut max_x = 0;
        for y in top..=bottom {
            for x in 0..image.width() {
                if image.get_pixel(x, y).0[0] < 128 {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                }
            }
        }
        if min_x == u32::MAX {
            return None;
        }
        Some([min_x, top, max_x - min_x + 1, bottom - top + 1])
    }
}

impl LayoutAnalyzer for SimpleLayoutAnalyzer {
    fn analyze(&self, image: &GrayImage) -> Vec<LayoutRegion> {
        let rows = Self::ink_rows(image);
        let mut regions = Vec::new();

        let mut band_start: Option<u32> = None;
        let mut gap = 0u32;
        for (y, &has_ink) in rows.iter().enumerate() {
            let y = y as u32;
            match (band_start, has_ink) {
                (None, true) => {
                    band_start = Some(y);
                    gap = 0;
                }
                (Some(start), false) => {
                    gap += 1;
                    if gap > self.max_row_gap {
                        let bottom = y - gap;
                        if let Some(bbox) = Self::band_bbox(image, start, bottom) {
                            regions.push(bbox);
                        }
                        band_start = None;
                    }
                }
                (Some(_), true) => gap = 0,
                (None, false) => {}
            }
        }
        if let Some(start) = band_start {
            if let Some(bbox) = Self::band_bbox(image, start, image.height() - 1) {
                regions.push(bbox);
            }
        }

        let mut blocks: Vec<LayoutRegion> = regions
            .into_iter()
            .filter(|bbox| bbox[2] * bbox[3] >= self.min_area)
            .map(|bbox| LayoutRegion {
                id: Uuid::new_v4().to_string(),
                bbox,
                kind: BlockType::Paragraph,
            })
            .collect();

        if blocks.is_empty() && image.width() > 0 && image.height() > 0 {
            blocks.push(LayoutRegion {
                id: Uuid::new_v4().to_string(),
                bbox: [0, 0, image.width(), image.height()],
                kind: BlockType::Paragraph,
            });
        }

        blocks.sort_by_key(|block| (block.bbox[1], block.bbox[0]));
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn page_with_two_bands() -> GrayImage {
        let mut img = GrayImage::from_pixel(100, 100, Luma([255]));
        for y in 10..25 {
            for x in 5..95 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        for y in 60..80 {
            for x in 10..90 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn separated_bands_become_separate_regions() {
        let regions = SimpleLayoutAnalyzer::default().analyze(&page_with_two_bands());
        assert_eq!(regions.len(), 2);
        // Sorted top to bottom
        assert!(regions[0].bbox[1] < regions[1].bbox[1]);
        assert_eq!(regions[0].bbox, [5, 10, 90, 15]);
    }

    #[test]
    fn blank_page_falls_back_to_full_page_region() {
        let img = GrayImage::from_pixel(50, 40, Luma([255]));
        let regions = SimpleLayoutAnalyzer::default().analyze(&img);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, [0, 0, 50, 40]);
    }

    #[test]
    fn specks_below_min_area_are_dropped() {
        let mut img = GrayImage::from_pixel(100, 100, Luma([255]));
        img.put_pixel(50, 50, Luma([0]));
        let regions = SimpleLayoutAnalyzer::default().analyze(&img);
        // The speck is filtered, leaving only the fallback block.
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, [0, 0, 100, 100]);
    }

    #[test]
    fn region_ids_are_unique() {
        let regions = SimpleLayoutAnalyzer::default().analyze(&page_with_two_bands());
        assert_ne!(regions[0].id, regions[1].id);
    }
}
