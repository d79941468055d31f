#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Shrinks the rectangle by `border` on all four sides; `None` once nothing is left.
    pub fn inset(self, border: f64) -> Option<Rect> {
        let width = self.width - 2.0 * border;
        let height = self.height - 2.0 * border;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Rect {
            x: self.x + border,
            y: self.y + border,
            width,
            height,
        })
    }
}

/// Where the item at `index` of the input landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub rect: Rect,
}

/// Squarified layout of `sizes` inside `bounds`, in input order.
///
/// Sizes are normalised so they sum to the area of `bounds`. Zero sizes get no placement;
/// empty input, an all-zero input or a zero-area rectangle yields no placements at all.
pub fn layout_treemap(sizes: &[u64], bounds: Rect) -> Vec<Placement> {
    let bounds_area = bounds.area();
    if sizes.is_empty() || bounds_area <= 0.0 {
        return Vec::new();
    }

    let total = sizes.iter().map(|&size| size as f64).sum::<f64>();
    if total <= 0.0 {
        return Vec::new();
    }

    let weighted = sizes
        .iter()
        .enumerate()
        .filter(|(_, size)| **size > 0)
        .map(|(index, &size)| WeightedItem {
            index,
            area: (size as f64) * bounds_area / total,
        })
        .collect::<Vec<_>>();

    squarify(&weighted, bounds)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightedItem {
    index: usize,
    area: f64,
}

fn squarify(items: &[WeightedItem], mut bounds: Rect) -> Vec<Placement> {
    let mut placements = Vec::with_capacity(items.len());
    let mut row_start = 0usize;
    let mut row_stats: Option<RowStats> = None;

    for (position, next) in items.iter().enumerate() {
        let Some(current) = row_stats else {
            row_start = position;
            row_stats = Some(RowStats::from_item(next));
            continue;
        };

        let short_side = bounds.width.min(bounds.height);
        let candidate = current.with_item(next);
        if candidate.worst_aspect_ratio(short_side) <= current.worst_aspect_ratio(short_side) {
            row_stats = Some(candidate);
            continue;
        }

        bounds = layout_row(&items[row_start..position], bounds, current.row_area, &mut placements);
        row_start = position;
        row_stats = Some(RowStats::from_item(next));
    }

    if let Some(current) = row_stats {
        layout_row(&items[row_start..], bounds, current.row_area, &mut placements);
    }

    placements
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RowStats {
    row_area: f64,
    min_area: f64,
    max_area: f64,
}

impl RowStats {
    fn from_item(item: &WeightedItem) -> Self {
        Self {
            row_area: item.area,
            min_area: item.area,
            max_area: item.area,
        }
    }

    fn with_item(self, item: &WeightedItem) -> Self {
        Self {
            row_area: self.row_area + item.area,
            min_area: self.min_area.min(item.area),
            max_area: self.max_area.max(item.area),
        }
    }

    fn worst_aspect_ratio(self, short_side: f64) -> f64 {
        if self.row_area <= 0.0 || self.min_area <= 0.0 || short_side <= 0.0 {
            return f64::INFINITY;
        }

        let short_side_squared = short_side * short_side;
        let row_area_squared = self.row_area * self.row_area;
        let first = (short_side_squared * self.max_area) / row_area_squared;
        let second = row_area_squared / (short_side_squared * self.min_area);
        first.max(second)
    }
}

/// Places one row along the shorter side of `bounds` and returns what is left.
fn layout_row(
    row: &[WeightedItem],
    bounds: Rect,
    row_area: f64,
    placements: &mut Vec<Placement>,
) -> Rect {
    if row_area <= 0.0 || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return bounds;
    }

    if bounds.width <= bounds.height {
        let row_height = (row_area / bounds.width).min(bounds.height);
        let mut x = bounds.x;
        for item in row {
            let item_width = item.area / row_height;
            placements.push(Placement {
                index: item.index,
                rect: Rect::new(x, bounds.y, item_width, row_height),
            });
            x += item_width;
        }
        Rect::new(
            bounds.x,
            bounds.y + row_height,
            bounds.width,
            (bounds.height - row_height).max(0.0),
        )
    } else {
        let row_width = (row_area / bounds.height).min(bounds.width);
        let mut y = bounds.y;
        for item in row {
            let item_height = item.area / row_width;
            placements.push(Placement {
                index: item.index,
                rect: Rect::new(bounds.x, y, row_width, item_height),
            });
            y += item_height;
        }
        Rect::new(
            bounds.x + row_width,
            bounds.y,
            (bounds.width - row_width).max(0.0),
            bounds.height,
        )
    }
}
