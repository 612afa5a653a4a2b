//! Brush patterns used to paint cells onto the world (C2).
//!
//! Grounded in `original_source/src/CellBrush.hh`/`.cc`. The monotonic
//! optimization (`m_monotonic`/`m_monotonicState`) for brushes that are a
//! single repeated state is kept verbatim, since it is exactly the kind of
//! "large brush of one state" (standard pencil, eraser) the engine paints
//! most often.

use crate::cells::{Alive, Dead, State};
use crate::error::Error;
use std::path::Path;

/// A rectangular pattern of cell states, with its origin at its logical
/// center (spec.md §4.2).
#[derive(Clone, Debug)]
pub struct Brush {
    width: u32,
    height: u32,
    data: Data,
}

#[derive(Clone, Debug)]
enum Data {
    /// Every cell in the rectangle has the same state.
    Monotonic(State),
    /// Row-major (`y = 0` is the bottom row), `width * height` long.
    Pattern(Vec<State>),
}

impl Brush {
    /// Creates a brush filled entirely with `state`.
    pub fn monotonic(width: u32, height: u32, state: State) -> Self {
        Brush {
            width,
            height,
            data: Data::Monotonic(state),
        }
    }

    /// Creates a brush from an explicit pattern. `rows` is given top row
    /// first (as a human would type it), each inner vector exactly `width`
    /// long; `rows.len()` must equal `height` for the brush to be
    /// considered well formed, otherwise out-of-range queries return
    /// `Dead`.
    pub fn from_pattern(width: u32, height: u32, rows: Vec<Vec<State>>) -> Self {
        let mut data = vec![Dead; (width as usize) * (height as usize)];
        for (row_from_top, row) in rows.iter().enumerate() {
            if row_from_top >= height as usize {
                break;
            }
            let y = height as usize - 1 - row_from_top;
            for (x, state) in row.iter().enumerate() {
                if x >= width as usize {
                    break;
                }
                data[y * width as usize + x] = *state;
            }
        }
        Brush {
            width,
            height,
            data: Data::Pattern(data),
        }
    }

    /// Loads a brush from a file following the §4.2 wire format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::BrushFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text, false)
    }

    /// Parses the §4.2 wire format from an in-memory string, with an
    /// optional `invert_y` flag reversing row order while loading.
    pub fn from_text(text: &str, invert_y: bool) -> Result<Self, Error> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| Error::BrushHeader(String::new()))?;
        let (w, h) = parse_header(header)?;

        let mut rows: Vec<Vec<State>> = Vec::with_capacity(h as usize);
        for (row_idx, line) in lines.by_ref().take(h as usize).enumerate() {
            rows.push(parse_row(line, w, row_idx));
        }

        if rows.len() < h as usize {
            log::warn!(
                "brush declared {} rows but only {} were present; padding with Dead",
                h,
                rows.len()
            );
            while rows.len() < h as usize {
                rows.push(vec![Dead; w as usize]);
            }
        }

        if invert_y {
            rows.reverse();
        }

        Ok(Brush::from_pattern(w, h, rows))
    }

    /// The brush's size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `true` if this brush stores a single repeated state rather than a
    /// full pattern (the "large single-state brush" optimization).
    pub fn is_monotonic(&self) -> bool {
        matches!(self.data, Data::Monotonic(_))
    }

    /// The state of the cell at local coordinate `(x, y)`, where `(0, 0)`
    /// is the bottom-left corner. Out-of-rectangle coordinates return
    /// `Dead`.
    pub fn state_at(&self, x: i32, y: i32) -> State {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return Dead;
        }
        match &self.data {
            Data::Monotonic(s) => *s,
            Data::Pattern(cells) => cells[y as usize * self.width as usize + x as usize],
        }
    }

    /// Builds the inverse of this brush: every state is toggled
    /// `Alive <-> Dead` over the same rectangle. Used by the round-trip
    /// law in spec.md §8 (`paint(brush)` then `paint(inverse)` is a
    /// no-op).
    pub fn inverse(&self) -> Brush {
        match &self.data {
            Data::Monotonic(s) => Brush::monotonic(self.width, self.height, toggle(*s)),
            Data::Pattern(cells) => Brush {
                width: self.width,
                height: self.height,
                data: Data::Pattern(cells.iter().map(|s| toggle(*s)).collect()),
            },
        }
    }
}

fn toggle(s: State) -> State {
    match s {
        Alive => Dead,
        Dead => Alive,
    }
}

fn parse_header(line: &str) -> Result<(u32, u32), Error> {
    let (w, h) = line
        .split_once('x')
        .ok_or_else(|| Error::BrushHeader(line.to_string()))?;
    let w: u32 = w
        .trim()
        .parse()
        .map_err(|_| Error::BrushHeader(line.to_string()))?;
    let h: u32 = h
        .trim()
        .parse()
        .map_err(|_| Error::BrushHeader(line.to_string()))?;
    if w == 0 || h == 0 {
        return Err(Error::BrushHeader(line.to_string()));
    }
    Ok((w, h))
}

fn parse_row(line: &str, width: u32, row_idx: usize) -> Vec<State> {
    let mut row = Vec::with_capacity(width as usize);
    let chars: Vec<char> = line.chars().collect();

    if chars.len() < width as usize {
        log::warn!(
            "brush row {} is {} chars, expected {}; padding with Dead",
            row_idx,
            chars.len(),
            width
        );
    }

    for i in 0..width as usize {
        let state = match chars.get(i) {
            Some('2') => Alive,
            Some('0') | Some('1') | Some('3') => Dead,
            Some(other) => {
                log::warn!(
                    "unrecognized brush character {:?} at row {} column {}; treating as Dead",
                    other,
                    row_idx,
                    i
                );
                Dead
            }
            None => Dead,
        };
        row.push(state);
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_returns_fill_within_bounds_and_dead_outside() -> Result<(), Error> {
        let b = Brush::monotonic(3, 3, Alive);
        assert_eq!(b.state_at(0, 0), Alive);
        assert_eq!(b.state_at(2, 2), Alive);
        assert_eq!(b.state_at(3, 0), Dead);
        assert_eq!(b.state_at(-1, 0), Dead);
        Ok(())
    }

    #[test]
    fn pattern_respects_top_down_row_order() -> Result<(), Error> {
        let rows = vec![vec![Alive, Dead], vec![Dead, Alive]];
        let b = Brush::from_pattern(2, 2, rows);
        // Top row (given first) should land at y = height - 1 = 1.
        assert_eq!(b.state_at(0, 1), Alive);
        assert_eq!(b.state_at(1, 1), Dead);
        assert_eq!(b.state_at(0, 0), Dead);
        assert_eq!(b.state_at(1, 0), Alive);
        Ok(())
    }

    #[test]
    fn from_text_parses_header_and_body() -> Result<(), Error> {
        let text = "2x2\n20\n02\n";
        let b = Brush::from_text(text, false)?;
        assert_eq!(b.size(), (2, 2));
        assert_eq!(b.state_at(0, 1), Alive);
        assert_eq!(b.state_at(1, 0), Alive);
        Ok(())
    }

    #[test]
    fn from_text_treats_legacy_digits_as_dead() -> Result<(), Error> {
        let text = "2x1\n13\n";
        let b = Brush::from_text(text, false)?;
        assert_eq!(b.state_at(0, 0), Dead);
        assert_eq!(b.state_at(1, 0), Dead);
        Ok(())
    }

    #[test]
    fn from_text_pads_short_rows_and_missing_rows() -> Result<(), Error> {
        let text = "3x2\n2\n";
        let b = Brush::from_text(text, false)?;
        assert_eq!(b.state_at(0, 1), Alive);
        assert_eq!(b.state_at(1, 1), Dead);
        assert_eq!(b.state_at(0, 0), Dead);
        Ok(())
    }

    #[test]
    fn from_text_rejects_bad_header() -> Result<(), Error> {
        assert!(Brush::from_text("not-a-header\n", false).is_err());
        Ok(())
    }

    #[test]
    fn inverse_toggles_states() -> Result<(), Error> {
        let b = Brush::monotonic(2, 2, Alive);
        let inv = b.inverse();
        assert_eq!(inv.state_at(0, 0), Dead);
        Ok(())
    }

    #[test]
    fn invert_y_reverses_row_order() -> Result<(), Error> {
        let text = "1x2\n2\n0\n";
        let normal = Brush::from_text(text, false)?;
        let inverted = Brush::from_text(text, true)?;
        assert_eq!(normal.state_at(0, 1), Alive);
        assert_eq!(normal.state_at(0, 0), Dead);
        assert_eq!(inverted.state_at(0, 0), Alive);
        assert_eq!(inverted.state_at(0, 1), Dead);
        Ok(())
    }
}
