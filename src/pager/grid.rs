//! Desktop Grid
//!
//! Owns the desktop count and the geometric partition of the pager area
//! into one cell per virtual desktop, under a configurable rows/columns,
//! orientation and starting-corner policy.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use x11rb::protocol::xproto::Window;

use crate::pager::xops::ProxyOps;
use crate::pager::Rect;

/// Fill order of the desktop grid, as in `_NET_DESKTOP_LAYOUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Desktops fill rows first (row-major).
    Horizontal,
    /// Desktops fill columns first (column-major).
    Vertical,
}

/// Corner holding desktop 0, as in `_NET_DESKTOP_LAYOUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Orientation {
    pub fn layout_value(self) -> u32 {
        match self {
            Orientation::Horizontal => 0,
            Orientation::Vertical => 1,
        }
    }
}

impl Corner {
    pub fn layout_value(self) -> u32 {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomRight => 2,
            Corner::BottomLeft => 3,
        }
    }
}

/// Grid shape policy. A zero row or column count means "derive from the
/// number of desktops".
#[derive(Debug, Clone, Copy)]
pub struct GridPolicy {
    pub rows: u16,
    pub cols: u16,
    pub orientation: Orientation,
    pub corner: Corner,
}

impl GridPolicy {
    /// Derive the effective row/column counts for `ndesktops` desktops.
    ///
    /// Unset (zero) counts are derived by ceiling division so that
    /// `rows * cols >= ndesktops`; non-positive results floor to 1.
    pub fn dims(&self, ndesktops: u32) -> (u16, u16) {
        let n = ndesktops.max(1);
        let (mut rows, mut cols) = (u32::from(self.rows), u32::from(self.cols));
        match (rows, cols) {
            (0, 0) => match self.orientation {
                Orientation::Horizontal => {
                    rows = 1;
                    cols = n;
                }
                Orientation::Vertical => {
                    rows = n;
                    cols = 1;
                }
            },
            (0, c) => rows = n.div_ceil(c),
            (r, 0) => cols = n.div_ceil(r),
            _ => {}
        }
        (rows.max(1).min(u32::from(u16::MAX)) as u16, cols.max(1).min(u32::from(u16::MAX)) as u16)
    }
}

/// Usable span of one grid axis: the pager extent minus the frame inset on
/// both sides and one separator between each pair of cells, floored at 1.
pub fn usable_span(total: u16, frame: u16, separator: u16, cells: u16) -> u16 {
    let span = i32::from(total)
        - 2 * i32::from(frame)
        - i32::from(separator) * (i32::from(cells) - 1);
    span.max(1) as u16
}

/// Cell rectangle for desktop `index` inside a `rows x cols` grid over a
/// `w x h` usable area.
///
/// Pure function of its inputs: boundaries come from proportional division
/// (`w * col / cols`), never iterative accumulation, so recomputation is
/// always bit-identical. Every cell is at least 1x1.
pub fn cell_rect(
    index: u32,
    rows: u16,
    cols: u16,
    w: u16,
    h: u16,
    separator: u16,
    orientation: Orientation,
    corner: Corner,
) -> Rect {
    let rows = u32::from(rows.max(1));
    let cols = u32::from(cols.max(1));
    let (mut col, mut row) = match orientation {
        Orientation::Horizontal => (index % cols, (index / cols) % rows),
        Orientation::Vertical => ((index / rows) % cols, index % rows),
    };
    if matches!(corner, Corner::TopRight | Corner::BottomRight) {
        col = cols - 1 - col;
    }
    if matches!(corner, Corner::BottomLeft | Corner::BottomRight) {
        row = rows - 1 - row;
    }
    let (w, h, sep) = (u32::from(w), u32::from(h), u32::from(separator));
    let x = w * col / cols + col * sep;
    let y = h * row / rows + row * sep;
    let width = (w * (col + 1) / cols - w * col / cols).max(1);
    let height = (h * (row + 1) / rows - h * row / rows).max(1);
    Rect {
        x: x.min(i16::MAX as u32) as i16,
        y: y.min(i16::MAX as u32) as i16,
        width: width.min(u16::MAX as u32) as u16,
        height: height.min(u16::MAX as u32) as u16,
    }
}

/// One desktop cell: its mini-window and its placed rectangle in
/// pager-window coordinates (frame inset included).
#[derive(Debug)]
pub struct DesktopCell {
    pub window: Window,
    pub rect: Rect,
}

/// The desktop grid: cells in desktop-index order.
#[derive(Debug)]
pub struct DesktopGrid {
    policy: GridPolicy,
    rows: u16,
    cols: u16,
    cells: Vec<DesktopCell>,
}

impl DesktopGrid {
    pub fn new(policy: GridPolicy) -> Self {
        Self {
            policy,
            rows: 1,
            cols: 1,
            cells: Vec::new(),
        }
    }

    pub fn len(&self) -> u32 {
        self.cells.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn policy(&self) -> &GridPolicy {
        &self.policy
    }

    pub fn cells(&self) -> &[DesktopCell] {
        &self.cells
    }

    pub fn cell(&self, desktop: u32) -> Option<&DesktopCell> {
        self.cells.get(desktop as usize)
    }

    /// Desktop index of the cell with the given mini-window, if any.
    pub fn find_cell(&self, window: Window) -> Option<u32> {
        self.cells
            .iter()
            .position(|c| c.window == window)
            .map(|i| i as u32)
    }

    /// Desktop index of the cell containing the given pager-window point.
    pub fn cell_at(&self, x: i16, y: i16) -> Option<u32> {
        let (x, y) = (i32::from(x), i32::from(y));
        self.cells
            .iter()
            .position(|c| {
                x >= i32::from(c.rect.x)
                    && x < i32::from(c.rect.x) + i32::from(c.rect.width)
                    && y >= i32::from(c.rect.y)
                    && y < i32::from(c.rect.y) + i32::from(c.rect.height)
            })
            .map(|i| i as u32)
    }

    /// Destroy all cells and allocate a fresh set for `ndesktops` desktops.
    ///
    /// Desktop-count changes are rare and treated as a hard resync boundary:
    /// the caller is responsible for destroying client proxies first.
    pub fn reset<O: ProxyOps>(
        &mut self,
        ndesktops: u32,
        parent: Window,
        ops: &mut O,
    ) -> Result<()> {
        for cell in self.cells.drain(..) {
            ops.destroy_window(cell.window)?;
        }
        if ndesktops == 0 {
            self.rows = 1;
            self.cols = 1;
            return Ok(());
        }
        let (rows, cols) = self.policy.dims(ndesktops);
        self.rows = rows;
        self.cols = cols;
        for _ in 0..ndesktops {
            let window = ops.create_window(parent, 0)?;
            ops.map(window)?;
            self.cells.push(DesktopCell {
                window,
                rect: Rect::default(),
            });
        }
        Ok(())
    }

    /// Recompute every cell rectangle for the given pager geometry and move
    /// the cell windows into place.
    pub fn layout<O: ProxyOps>(
        &mut self,
        pager: Rect,
        frame: u16,
        separator: u16,
        ops: &mut O,
    ) -> Result<()> {
        let w = usable_span(pager.width, frame, separator, self.cols);
        let h = usable_span(pager.height, frame, separator, self.rows);
        let (orientation, corner) = (self.policy.orientation, self.policy.corner);
        let (rows, cols) = (self.rows, self.cols);
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let mut rect = cell_rect(i as u32, rows, cols, w, h, separator, orientation, corner);
            rect.x += frame as i16;
            rect.y += frame as i16;
            cell.rect = rect;
            ops.move_resize(cell.window, rect)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(rows: u16, cols: u16) -> GridPolicy {
        GridPolicy {
            rows,
            cols,
            orientation: Orientation::Horizontal,
            corner: Corner::TopLeft,
        }
    }

    #[test]
    fn dims_derive_missing_axis() {
        assert_eq!(policy(0, 2).dims(4), (2, 2));
        assert_eq!(policy(0, 3).dims(4), (2, 3));
        assert_eq!(policy(2, 0).dims(5), (2, 3));
        assert_eq!(policy(3, 5).dims(4), (3, 5));
    }

    #[test]
    fn dims_both_unset_follow_orientation() {
        assert_eq!(policy(0, 0).dims(5), (1, 5));
        let vertical = GridPolicy {
            orientation: Orientation::Vertical,
            ..policy(0, 0)
        };
        assert_eq!(vertical.dims(5), (5, 1));
    }

    #[test]
    fn dims_floor_to_one() {
        assert_eq!(policy(0, 7).dims(0), (1, 7));
    }

    #[test]
    fn partition_is_exact() {
        for &cols in &[1u16, 2, 3, 5, 7] {
            for &w in &[7u16, 58, 63, 97, 640] {
                let widths: Vec<u16> = (0..cols)
                    .map(|c| {
                        cell_rect(
                            u32::from(c),
                            1,
                            cols,
                            w,
                            20,
                            1,
                            Orientation::Horizontal,
                            Corner::TopLeft,
                        )
                        .width
                    })
                    .collect();
                assert!(widths.iter().all(|&cw| cw >= 1));
                if w >= cols {
                    assert_eq!(widths.iter().map(|&cw| u32::from(cw)).sum::<u32>(), u32::from(w));
                }
            }
        }
    }

    #[test]
    fn partition_floors_degenerate_cells() {
        // narrower than the column count: every cell still gets >= 1 pixel
        for c in 0..5u32 {
            let rect = cell_rect(c, 1, 5, 3, 3, 1, Orientation::Horizontal, Corner::TopLeft);
            assert!(rect.width >= 1);
            assert!(rect.height >= 1);
        }
    }

    #[test]
    fn boundaries_include_separator_term() {
        // boundary at column x is floor(w*x/cols) + x for separator width 1
        let w = 58u16;
        for col in 0..3u32 {
            let rect = cell_rect(col, 1, 3, w, 20, 1, Orientation::Horizontal, Corner::TopLeft);
            assert_eq!(i32::from(rect.x), (i32::from(w) * col as i32) / 3 + col as i32);
        }
    }

    #[test]
    fn right_corners_mirror_columns() {
        let (rows, cols) = (2, 3);
        for i in 0..6u32 {
            let tl = cell_rect(i, rows, cols, 60, 40, 1, Orientation::Horizontal, Corner::TopLeft);
            let tr = cell_rect(i, rows, cols, 60, 40, 1, Orientation::Horizontal, Corner::TopRight);
            let mirrored = 2 - (i % 3);
            let expect = cell_rect(
                (i / 3) * 3 + mirrored,
                rows,
                cols,
                60,
                40,
                1,
                Orientation::Horizontal,
                Corner::TopLeft,
            );
            assert_eq!(tr.x, expect.x);
            assert_eq!(tr.y, tl.y);
        }
    }

    #[test]
    fn bottom_corners_mirror_rows() {
        let top = cell_rect(0, 2, 2, 40, 40, 1, Orientation::Horizontal, Corner::TopLeft);
        let bottom = cell_rect(0, 2, 2, 40, 40, 1, Orientation::Horizontal, Corner::BottomLeft);
        assert_eq!(bottom.x, top.x);
        let last_row = cell_rect(2, 2, 2, 40, 40, 1, Orientation::Horizontal, Corner::TopLeft);
        assert_eq!(bottom.y, last_row.y);
    }

    #[test]
    fn all_four_corners_are_distinct_origins() {
        let corners = [
            Corner::TopLeft,
            Corner::TopRight,
            Corner::BottomRight,
            Corner::BottomLeft,
        ];
        let origins: Vec<(i16, i16)> = corners
            .iter()
            .map(|&corner| {
                let r = cell_rect(0, 2, 2, 40, 40, 1, Orientation::Horizontal, corner);
                (r.x, r.y)
            })
            .collect();
        for i in 0..origins.len() {
            for j in i + 1..origins.len() {
                assert_ne!(origins[i], origins[j]);
            }
        }
    }

    #[test]
    fn vertical_orientation_transposes_fill_order() {
        // index 1 goes right in a horizontal grid, down in a vertical one
        let horizontal = cell_rect(1, 2, 2, 40, 40, 1, Orientation::Horizontal, Corner::TopLeft);
        let vertical = cell_rect(1, 2, 2, 40, 40, 1, Orientation::Vertical, Corner::TopLeft);
        assert!(horizontal.x > 0 && horizontal.y == 0);
        assert!(vertical.x == 0 && vertical.y > 0);
    }

    #[test]
    fn cell_at_handles_cells_wider_than_i16() {
        use crate::pager::xops::testing::RecordingOps;
        let mut ops = RecordingOps::new();
        let mut grid = DesktopGrid::new(policy(1, 1));
        grid.reset(1, 1000, &mut ops).unwrap();
        grid.layout(
            Rect {
                x: 0,
                y: 0,
                width: 65535,
                height: 40,
            },
            1,
            1,
            &mut ops,
        )
        .unwrap();
        // the single cell spans past i16::MAX; the hit-test must not wrap
        assert_eq!(grid.cell_at(32000, 10), Some(0));
        assert_eq!(grid.cell_at(10, 39), None);
    }

    #[test]
    fn cell_rect_is_deterministic() {
        for i in 0..9u32 {
            let a = cell_rect(i, 3, 3, 97, 59, 1, Orientation::Vertical, Corner::BottomRight);
            let b = cell_rect(i, 3, 3, 97, 59, 1, Orientation::Vertical, Corner::BottomRight);
            assert_eq!(a, b);
        }
    }
}
