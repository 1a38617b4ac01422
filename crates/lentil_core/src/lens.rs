//! Lens prescription parsing.
//!
//! A prescription file is a whitespace-separated table of numbers, four per
//! interface: curvature radius (mm), thickness to the next interface (mm),
//! index of refraction, and aperture diameter (mm). `#` starts a comment that
//! runs to the end of the line. Interfaces are listed from the object side of
//! the lens toward the film.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest numeric token accepted by the parser.
const MAX_TOKEN_LEN: usize = 32;

/// Prescription units are millimeters; scenes are in meters.
const MM_TO_M: f32 = 0.001;

/// Errors that can occur while reading a lens prescription.
#[derive(Error, Debug)]
pub enum LensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: unexpected character '{ch}'")]
    UnexpectedCharacter { line: usize, ch: char },

    #[error("Line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("Line {line}: numeric token longer than 32 characters")]
    TokenTooLong { line: usize },

    #[error("Expected four values per interface, found {values} values")]
    IncompleteInterface { values: usize },
}

pub type LensResult<T> = Result<T, LensError>;

/// One spherical interface (or aperture stop) of a compound lens.
///
/// All lengths are in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LensInterface {
    /// Signed curvature radius; zero marks an aperture stop
    pub radius: f32,

    /// Distance along the axis to the next interface
    pub thickness: f32,

    /// Index of refraction of the medium behind this interface (0 for a stop)
    pub ior: f32,

    /// Aperture radius
    pub aperture: f32,
}

impl LensInterface {
    /// Build an interface from prescription values in millimeters.
    ///
    /// `aperture_diameter` is converted to a radius.
    pub fn from_millimeters(radius: f32, thickness: f32, ior: f32, aperture_diameter: f32) -> Self {
        Self {
            radius: radius * MM_TO_M,
            thickness: thickness * MM_TO_M,
            ior,
            aperture: aperture_diameter * MM_TO_M / 2.0,
        }
    }

    /// True for the aperture stop.
    pub fn is_stop(&self) -> bool {
        self.radius == 0.0
    }
}

/// Parse a lens prescription from text.
pub fn parse_lens_prescription(text: &str) -> LensResult<Vec<LensInterface>> {
    let values = tokenize(text)?;

    if values.len() % 4 != 0 {
        return Err(LensError::IncompleteInterface {
            values: values.len(),
        });
    }

    Ok(values
        .chunks_exact(4)
        .map(|v| LensInterface::from_millimeters(v[0], v[1], v[2], v[3]))
        .collect())
}

/// Read and parse a lens prescription file.
pub fn load_lens_file<P: AsRef<Path>>(path: P) -> LensResult<Vec<LensInterface>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let interfaces = parse_lens_prescription(&text)?;

    log::info!(
        "Loaded lens prescription {} ({} interfaces)",
        path.display(),
        interfaces.len()
    );

    Ok(interfaces)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')
}

/// Split the text into numbers, skipping comments and whitespace.
fn tokenize(text: &str) -> LensResult<Vec<f32>> {
    let mut values = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };

        let mut chars = line.char_indices().peekable();
        while let Some(&(start, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }
            if !is_number_char(c) {
                return Err(LensError::UnexpectedCharacter { line: line_no, ch: c });
            }

            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                if !is_number_char(c) {
                    return Err(LensError::UnexpectedCharacter { line: line_no, ch: c });
                }
                end = i + c.len_utf8();
                chars.next();
            }

            let token = &line[start..end];
            if token.len() > MAX_TOKEN_LEN {
                return Err(LensError::TokenTooLong { line: line_no });
            }
            let value = token.parse::<f32>().map_err(|_| LensError::InvalidNumber {
                line: line_no,
                token: token.to_string(),
            })?;
            values.push(value);
        }
    }

    Ok(values)
}
