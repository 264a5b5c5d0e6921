//! Gesture configuration loader.
//!
//! Reads an s-expression document:
//!
//! ```text
//! (:settings (:speed-samples 3 :swipe-fast-threshold 20 :stroke-timeout-ms 250)
//!  :gestures ((:name "workspace-left" :type swipe :fingers (3 3) :direction left
//!              :threshold 50 :trigger-on-threshold t
//!              :actions ((:name "ws-left" :block-other-actions t)))))
//! ```
//!
//! Malformed documents are errors.  A malformed gesture is kept but
//! disabled, with a warning, so one typo never takes down the rest.

use std::path::Path;

use anyhow::{bail, Context};
use lexpr::Value;
use tracing::{info, warn};

use crate::action::NamedAction;
use crate::gesture::{Direction, Gesture, Speed, TriggerType};
use crate::handler::HandlerConfig;
use crate::input::Modifiers;
use crate::sexp::{
    as_float, atom_to_string, get_bool, get_float, get_int, get_keyword, get_string, get_value,
    list_items,
};
use crate::stroke::{Point, Stroke};

/// A loaded configuration.
#[derive(Debug, Default)]
pub struct Config {
    pub settings: HandlerConfig,
    pub gestures: Vec<Gesture>,
}

impl Config {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!(
            path = %path.display(),
            gestures = config.gestures.len(),
            "config loaded"
        );
        Ok(config)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Config> {
        let value = lexpr::from_str(raw).context("invalid s-expression")?;
        if !matches!(value, Value::Cons(_) | Value::Null) {
            bail!("config must be a plist, got {}", value);
        }

        let settings = match get_value(&value, "settings") {
            Some(settings) => parse_settings(settings),
            None => HandlerConfig::default(),
        };
        let gestures = match get_value(&value, "gestures") {
            None => Vec::new(),
            Some(list @ (Value::Cons(_) | Value::Null)) => list_items(list)
                .into_iter()
                .enumerate()
                .map(|(index, entry)| parse_gesture(entry, index))
                .collect(),
            Some(other) => bail!(":gestures must be a list, got {}", other),
        };
        Ok(Config { settings, gestures })
    }

    /// S-expression form of the whole configuration.
    pub fn config_sexp(&self) -> String {
        let gestures: Vec<String> = self.gestures.iter().map(Gesture::to_sexp).collect();
        format!(
            "(:settings {} :gestures ({}))",
            self.settings.config_sexp(),
            gestures.join(" ")
        )
    }
}

fn parse_settings(value: &Value) -> HandlerConfig {
    let mut config = HandlerConfig::default();
    if let Some(n) = get_int(value, "speed-samples") {
        match u32::try_from(n) {
            Ok(n) => config.speed_samples = n,
            Err(_) => warn!(value = n, "invalid :speed-samples, using default"),
        }
    }
    let thresholds = [
        ("swipe-fast-threshold", &mut config.swipe_fast_threshold),
        ("pinch-in-fast-threshold", &mut config.pinch_in_fast_threshold),
        ("pinch-out-fast-threshold", &mut config.pinch_out_fast_threshold),
        ("rotate-fast-threshold", &mut config.rotate_fast_threshold),
        ("swipe-delta-multiplier", &mut config.swipe_delta_multiplier),
    ];
    for (key, slot) in thresholds {
        if let Some(v) = get_float(value, key) {
            if v.is_finite() && v >= 0.0 {
                *slot = v;
            } else {
                warn!(key, value = v, "invalid setting, using default");
            }
        }
    }
    if let Some(ms) = get_int(value, "stroke-timeout-ms") {
        match u64::try_from(ms) {
            Ok(ms) => config.stroke_timeout_ms = ms,
            Err(_) => warn!(value = ms, "invalid :stroke-timeout-ms, using default"),
        }
    }
    config
}

/// Build one gesture.  Never fails; invalid fields disable the gesture.
fn parse_gesture(value: &Value, index: usize) -> Gesture {
    let name = get_string(value, "name").unwrap_or_else(|| format!("gesture-{}", index));

    let trigger = get_keyword(value, "type").and_then(|t| TriggerType::parse(&t));
    let Some(trigger) = trigger else {
        warn!(gesture = %name, "missing or unknown :type, disabling");
        let mut gesture = Gesture::new(name, TriggerType::Hold);
        gesture.enabled = false;
        return gesture;
    };

    let mut gesture = Gesture::new(name, trigger);
    let mut valid = true;

    if let Some(fingers) = get_value(value, "fingers") {
        match parse_fingers(fingers) {
            Some((min, max)) => {
                if min > max {
                    warn!(gesture = %gesture.name, min, max, "finger range is empty");
                }
                gesture.fingers = min..=max;
            }
            None => {
                warn!(gesture = %gesture.name, "invalid :fingers {}", fingers);
                valid = false;
            }
        }
    }

    if let Some(direction) = get_keyword(value, "direction") {
        match Direction::parse(&direction) {
            Some(d) if d.applies_to(trigger) => gesture.direction = d,
            Some(_) => {
                warn!(gesture = %gesture.name, %direction, "direction does not apply to {}", trigger.as_str());
                valid = false;
            }
            None => {
                warn!(gesture = %gesture.name, %direction, "unknown direction");
                valid = false;
            }
        }
    }

    if let Some(speed) = get_keyword(value, "speed") {
        match Speed::parse(&speed) {
            Some(s) => gesture.speed = s,
            None => {
                warn!(gesture = %gesture.name, %speed, "unknown speed");
                valid = false;
            }
        }
    }

    if let Some(raw) = get_value(value, "threshold") {
        match as_float(raw) {
            Some(t) if t.is_finite() && t >= 0.0 => gesture.threshold = Some(t),
            _ => {
                warn!(gesture = %gesture.name, "invalid :threshold {}", raw);
                valid = false;
            }
        }
    }

    if let Some(on_threshold) = get_bool(value, "trigger-on-threshold") {
        gesture.trigger_when_threshold_reached = on_threshold;
    }

    if let Some(list) = get_value(value, "modifiers") {
        let mut modifiers = Modifiers::default();
        for item in list_items(list) {
            let name = atom_to_string(item).unwrap_or_default();
            if !modifiers.set_named(&name) {
                warn!(gesture = %gesture.name, modifier = %name, "unknown modifier");
                valid = false;
            }
        }
        gesture.modifiers = Some(modifiers);
    }

    if let Some(list) = get_value(value, "strokes") {
        if trigger != TriggerType::Stroke {
            warn!(gesture = %gesture.name, "strokes given for non-stroke gesture, ignoring");
        } else {
            for item in list_items(list) {
                match parse_stroke(item) {
                    Some(stroke) => gesture.strokes.push(stroke),
                    None => {
                        warn!(gesture = %gesture.name, "invalid stroke {}", item);
                        valid = false;
                    }
                }
            }
        }
    }
    if trigger == TriggerType::Stroke && gesture.strokes.is_empty() {
        warn!(gesture = %gesture.name, "stroke gesture without templates can never match");
    }

    if let Some(list) = get_value(value, "actions") {
        for item in list_items(list) {
            match get_string(item, "name") {
                Some(action) => {
                    let blocking = get_bool(item, "block-other-actions").unwrap_or(false);
                    gesture.actions.push(Box::new(NamedAction::new(action).blocking(blocking)));
                }
                None => warn!(gesture = %gesture.name, "action without :name, ignoring"),
            }
        }
    }

    if get_bool(value, "enabled") == Some(false) {
        valid = false;
    }
    gesture.enabled = valid;
    gesture
}

/// `(min max)` or a single count.
fn parse_fingers(value: &Value) -> Option<(u8, u8)> {
    let to_u8 = |v: &Value| v.as_i64().and_then(|n| u8::try_from(n).ok());
    match value {
        Value::Number(_) => to_u8(value).map(|n| (n, n)),
        Value::Cons(_) => match list_items(value).as_slice() {
            [min, max] => Some((to_u8(min)?, to_u8(max)?)),
            _ => None,
        },
        _ => None,
    }
}

/// Flat `(x y x y ...)` list of absolute points.
fn parse_stroke(value: &Value) -> Option<Stroke> {
    let coords: Option<Vec<f64>> = list_items(value).into_iter().map(as_float).collect();
    let coords = coords?;
    if coords.len() < 4 || coords.len() % 2 != 0 {
        return None;
    }
    let points: Vec<Point> = coords
        .chunks_exact(2)
        .map(|c| Point::new(c[0], c[1]))
        .collect();
    Some(Stroke::from_points(&points))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        (:settings (:speed-samples 5 :swipe-fast-threshold 30.5 :stroke-timeout-ms 400)
         :gestures ((:name "workspace-left" :type swipe :fingers (3 4) :direction left
                     :speed fast :threshold 50 :trigger-on-threshold t :modifiers (ctrl)
                     :actions ((:name "ws-left" :block-other-actions t)))
                    (:name "circle" :type stroke :fingers 3
                     :strokes ((0 0 10 0 10 10 0 10 0 0))
                     :actions ((:name "lock")))))
    "#;

    #[test]
    fn test_parse_settings() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.settings.speed_samples, 5);
        assert_eq!(config.settings.swipe_fast_threshold, 30.5);
        assert_eq!(config.settings.stroke_timeout_ms, 400);
        assert_eq!(config.settings.pinch_in_fast_threshold, 0.04);
    }

    #[test]
    fn test_parse_swipe_gesture() {
        let config = Config::parse(SAMPLE).unwrap();
        let swipe = &config.gestures[0];
        assert!(swipe.enabled);
        assert_eq!(swipe.name, "workspace-left");
        assert_eq!(swipe.trigger, TriggerType::Swipe);
        assert_eq!(swipe.fingers, 3..=4);
        assert_eq!(swipe.direction, Direction::Left);
        assert_eq!(swipe.speed, Speed::Fast);
        assert_eq!(swipe.threshold, Some(50.0));
        assert!(swipe.trigger_when_threshold_reached);
        assert_eq!(
            swipe.modifiers,
            Some(Modifiers {
                ctrl: true,
                ..Modifiers::default()
            })
        );
        assert_eq!(swipe.actions.len(), 1);
        assert!(swipe.actions[0].block_other_actions());
    }

    #[test]
    fn test_parse_stroke_gesture() {
        let config = Config::parse(SAMPLE).unwrap();
        let circle = &config.gestures[1];
        assert!(circle.enabled);
        assert_eq!(circle.fingers, 3..=3);
        assert_eq!(circle.strokes.len(), 1);
        assert!(!circle.actions[0].block_other_actions());
    }

    #[test]
    fn test_invalid_direction_disables() {
        let config = Config::parse("(:gestures ((:type pinch :direction left)))").unwrap();
        assert!(!config.gestures[0].enabled);
        assert_eq!(config.gestures[0].name, "gesture-0");
    }

    #[test]
    fn test_unknown_type_disables() {
        let config = Config::parse("(:gestures ((:name \"x\" :type wiggle)))").unwrap();
        assert!(!config.gestures[0].enabled);
    }

    #[test]
    fn test_invalid_fields_disable() {
        for raw in [
            "(:gestures ((:type swipe :fingers (1 2 3))))",
            "(:gestures ((:type swipe :fingers (-1 2))))",
            "(:gestures ((:type swipe :speed ludicrous)))",
            "(:gestures ((:type hold :threshold -5)))",
            "(:gestures ((:type swipe :modifiers (hyper))))",
            "(:gestures ((:type stroke :strokes ((0 0 1)))))",
            "(:gestures ((:type hold :enabled nil)))",
        ] {
            let config = Config::parse(raw).unwrap();
            assert!(!config.gestures[0].enabled, "{raw}");
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("(:gestures ((:type hold)))").unwrap();
        assert_eq!(config.settings, HandlerConfig::default());
        let hold = &config.gestures[0];
        assert!(hold.enabled);
        assert_eq!(hold.fingers, 1..=5);
        assert_eq!(hold.threshold, None);
        assert!(hold.modifiers.is_none());
    }

    #[test]
    fn test_malformed_document() {
        assert!(Config::parse("(:gestures").is_err());
        assert!(Config::parse("42").is_err());
        assert!(Config::parse("(:gestures 42)").is_err());
    }

    #[test]
    fn test_empty_document() {
        let config = Config::parse("()").unwrap();
        assert!(config.gestures.is_empty());
    }

    #[test]
    fn test_config_sexp_reparses() {
        let config = Config::parse(SAMPLE).unwrap();
        let again = Config::parse(&config.config_sexp()).unwrap();
        assert_eq!(again.settings, config.settings);
        assert_eq!(again.gestures.len(), 2);
        assert_eq!(again.gestures[0].fingers, 3..=4);
        assert_eq!(again.gestures[0].direction, Direction::Left);
        assert!(again.gestures[0].actions[0].block_other_actions());
        assert_eq!(again.gestures[1].strokes, config.gestures[1].strokes);
        assert_eq!(
            again.gestures[1].strokes[0].compare(&config.gestures[1].strokes[0]),
            1.0
        );
    }

    #[test]
    fn test_recorded_stroke_reloads_unchanged() {
        let recorded = Stroke::from_deltas(&[
            Point::new(3.5, 0.25),
            Point::new(0.0, 7.0),
            Point::new(-3.5, -0.125),
        ]);
        let raw = format!(
            "(:gestures ((:name \"mine\" :type stroke :strokes ({}))))",
            recorded.to_sexp()
        );
        let config = Config::parse(&raw).unwrap();
        assert_eq!(config.gestures[0].strokes, vec![recorded]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/gestures.el")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }
}
