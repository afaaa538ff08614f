//! Layout/Geometry Mapper
//!
//! Pure scaling from root-window coordinates into a desktop cell.

use crate::pager::Rect;

/// Scale a client rectangle from screen space into a cell rectangle.
///
/// Positions and sizes are mapped by the same `cell / screen` ratio with
/// truncating integer division; width and height floor at 1 so every proxy
/// stays visible. Pure and idempotent for a fixed cell and screen.
pub fn place_in_cell(client: Rect, cell: Rect, screen: Rect) -> Rect {
    let sw = i32::from(screen.width.max(1));
    let sh = i32::from(screen.height.max(1));
    let cw = i32::from(cell.width);
    let ch = i32::from(cell.height);
    let x = i32::from(client.x) * cw / sw;
    let y = i32::from(client.y) * ch / sh;
    let width = (i32::from(client.width) * cw / sw).max(1);
    let height = (i32::from(client.height) * ch / sh).max(1);
    Rect {
        x: x.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
        y: y.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
        width: width.min(i32::from(u16::MAX)) as u16,
        height: height.min(i32::from(u16::MAX)) as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };

    #[test]
    fn identity_at_ratio_one() {
        let client = Rect {
            x: 120,
            y: 340,
            width: 800,
            height: 600,
        };
        assert_eq!(place_in_cell(client, SCREEN, SCREEN), client);
    }

    #[test]
    fn scales_proportionally() {
        let cell = Rect {
            x: 0,
            y: 0,
            width: 192,
            height: 108,
        };
        let client = Rect {
            x: 960,
            y: 540,
            width: 960,
            height: 540,
        };
        let placed = place_in_cell(client, cell, SCREEN);
        assert_eq!(placed, Rect { x: 96, y: 54, width: 96, height: 54 });
    }

    #[test]
    fn floors_size_to_one() {
        let cell = Rect {
            x: 0,
            y: 0,
            width: 20,
            height: 20,
        };
        let client = Rect {
            x: 5,
            y: 5,
            width: 10,
            height: 10,
        };
        let placed = place_in_cell(client, cell, SCREEN);
        assert_eq!(placed.width, 1);
        assert_eq!(placed.height, 1);
    }

    #[test]
    fn negative_positions_survive() {
        let cell = Rect {
            x: 0,
            y: 0,
            width: 192,
            height: 108,
        };
        let client = Rect {
            x: -400,
            y: -200,
            width: 640,
            height: 480,
        };
        let placed = place_in_cell(client, cell, SCREEN);
        assert!(placed.x <= 0);
        assert!(placed.y <= 0);
        assert!(placed.width >= 1 && placed.height >= 1);
    }

    #[test]
    fn idempotent_for_fixed_cell() {
        let cell = Rect {
            x: 3,
            y: 3,
            width: 57,
            height: 31,
        };
        let client = Rect {
            x: 611,
            y: 233,
            width: 777,
            height: 412,
        };
        let once = place_in_cell(client, cell, SCREEN);
        let twice = place_in_cell(client, cell, SCREEN);
        assert_eq!(once, twice);
    }
}
