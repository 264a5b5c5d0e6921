//! Recorded input traces, replayed by the CLI.
//!
//! A trace is a list of event plists:
//!
//! ```text
//! ((:event begin :episode swipe :fingers 3)
//!  (:event motion :dx -10 :dy 0)
//!  (:event wait :ms 300)
//!  (:event end :episode swipe))
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use lexpr::Value;

use crate::input::{Episode, GestureUpdate, InputEvent};
use crate::sexp::{get_bool, get_float, get_int, get_keyword, list_items};
use crate::stroke::Point;

/// One replay step.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceStep {
    Input(InputEvent),
    /// Let the event loop run, so timers can fire.
    Wait(Duration),
    /// Capture the next swipe episode as a stroke.
    RecordStroke,
}

pub fn load(path: &Path) -> anyhow::Result<Vec<TraceStep>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse(&raw).with_context(|| format!("failed to parse trace {}", path.display()))
}

pub fn parse(raw: &str) -> anyhow::Result<Vec<TraceStep>> {
    let value = lexpr::from_str(raw).context("invalid s-expression")?;
    if !matches!(value, Value::Cons(_) | Value::Null) {
        bail!("trace must be a list of events, got {}", value);
    }
    list_items(&value)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_step(entry).with_context(|| format!("trace entry {}", index)))
        .collect()
}

fn parse_step(value: &Value) -> anyhow::Result<TraceStep> {
    let kind = get_keyword(value, "event").ok_or_else(|| anyhow!("missing :event in {}", value))?;
    let step = match kind.as_str() {
        "begin" => TraceStep::Input(InputEvent::GestureBegin {
            episode: episode(value)?,
            fingers: {
                let n = get_int(value, "fingers").unwrap_or(2);
                u8::try_from(n).with_context(|| format!("invalid :fingers {}", n))?
            },
        }),
        "motion" => TraceStep::Input(InputEvent::GestureUpdate(GestureUpdate::Motion {
            delta: Point::new(float(value, "dx")?, float(value, "dy")?),
        })),
        "pinch" => TraceStep::Input(InputEvent::GestureUpdate(GestureUpdate::Pinch {
            scale: float(value, "scale")?,
            angle_delta: get_float(value, "angle").unwrap_or(0.0),
            delta: Point::new(
                get_float(value, "dx").unwrap_or(0.0),
                get_float(value, "dy").unwrap_or(0.0),
            ),
        })),
        "hold" => TraceStep::Input(InputEvent::GestureUpdate(GestureUpdate::Hold {
            delta_ms: float(value, "ms")?,
        })),
        "key" => TraceStep::Input(InputEvent::KeyModifier {
            code: {
                let code = get_int(value, "code").ok_or_else(|| anyhow!("missing :code"))?;
                u32::try_from(code).with_context(|| format!("invalid :code {}", code))?
            },
            pressed: get_bool(value, "pressed").unwrap_or(true),
        }),
        "end" => TraceStep::Input(InputEvent::GestureEnd {
            episode: episode(value)?,
        }),
        "cancel" => TraceStep::Input(InputEvent::GestureCancel {
            episode: episode(value)?,
        }),
        "wait" => {
            let ms = get_int(value, "ms").ok_or_else(|| anyhow!("missing :ms"))?;
            TraceStep::Wait(Duration::from_millis(
                u64::try_from(ms).with_context(|| format!("invalid :ms {}", ms))?,
            ))
        }
        "record-stroke" => TraceStep::RecordStroke,
        other => bail!("unknown event type: {}", other),
    };
    Ok(step)
}

fn episode(value: &Value) -> anyhow::Result<Episode> {
    let name = get_keyword(value, "episode").ok_or_else(|| anyhow!("missing :episode"))?;
    Episode::parse(&name).ok_or_else(|| anyhow!("unknown episode: {}", name))
}

fn float(value: &Value, key: &str) -> anyhow::Result<f64> {
    get_float(value, key).ok_or_else(|| anyhow!("missing or invalid :{}", key))
}
