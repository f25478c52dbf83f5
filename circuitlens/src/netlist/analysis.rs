//! Analysis directive selected per request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Analysis {
    /// DC operating point.
    #[default]
    Op,
    /// DC sweep of one independent source.
    Dc {
        source: String,
        start: String,
        stop: String,
        step: String,
    },
    /// Transient analysis.
    Tran { step: String, stop: String },
    /// Small-signal AC sweep, decade spacing.
    Ac {
        points: u32,
        start: String,
        stop: String,
    },
}

impl Analysis {
    pub fn directive(&self) -> String {
        match self {
            Analysis::Op => ".op".to_string(),
            Analysis::Dc {
                source,
                start,
                stop,
                step,
            } => format!(".dc {} {} {} {}", source, start, stop, step),
            Analysis::Tran { step, stop } => format!(".tran {} {}", step, stop),
            Analysis::Ac {
                points,
                start,
                stop,
            } => format!(".ac dec {} {} {}", points, start, stop),
        }
    }

    /// Parse the CLI form: `op`, `dc:V1,0,5,0.1`, `tran:1u,1m`, `ac:10,1,1Meg`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        let (kind, args) = match text.split_once(':') {
            Some((kind, args)) => (kind, args.split(',').map(str::trim).collect::<Vec<_>>()),
            None => (text, Vec::new()),
        };

        match (kind.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("op", []) => Ok(Analysis::Op),
            ("dc", [source, start, stop, step]) => Ok(Analysis::Dc {
                source: source.to_string(),
                start: start.to_string(),
                stop: stop.to_string(),
                step: step.to_string(),
            }),
            ("tran", [step, stop]) => Ok(Analysis::Tran {
                step: step.to_string(),
                stop: stop.to_string(),
            }),
            ("ac", [points, start, stop]) => {
                let points = points
                    .parse::<u32>()
                    .map_err(|_| format!("AC point count {:?} is not a positive integer", points))?;
                if points == 0 {
                    return Err("AC point count must be at least 1".to_string());
                }
                Ok(Analysis::Ac {
                    points,
                    start: start.to_string(),
                    stop: stop.to_string(),
                })
            }
            _ => Err(format!(
                "unrecognized analysis {:?} (expected op, dc:SRC,START,STOP,STEP, tran:STEP,STOP or ac:POINTS,START,STOP)",
                text
            )),
        }
    }
}

impl std::fmt::Display for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.directive())
    }
}
