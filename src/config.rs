use std::collections::HashMap;
use std::fs;

/// Per-term evaluation multipliers. `evaluation::evaluate` does not currently read these (the
/// evaluator's constants are compile-time per SPEC_FULL.md §4.3); the record exists so the
/// recognized config surface matches the reference engine's `eval_weights` section and is ready
/// for a future tunable evaluator without changing the config format.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalWeights {
    pub pst: f64,
    pub mobility: f64,
    pub king_safety: f64,
    pub pawns: f64,
    pub rook_open_file: f64,
    pub bishop_pair: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            pst: 1.0,
            mobility: 0.1,
            king_safety: 0.2,
            pawns: 0.15,
            rook_open_file: 0.1,
            bishop_pair: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub emit_pv: bool,
    pub emit_depth_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { emit_pv: true, emit_depth_log: true }
    }
}

/// Validated engine configuration, delivered whole at construction time (§6.3). The engine never
/// re-reads this mid-run.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub max_depth: u8,
    /// Fixed time per move when no clock is supplied. `None` means depth-only search.
    pub time_ms: Option<u64>,
    pub tt_mb: usize,
    pub quiescence: bool,
    pub ordering: String,
    pub eval_weights: EvalWeights,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 7,
            time_ms: Some(1500),
            tt_mb: 128,
            quiescence: true,
            ordering: "tt_mvv_lva_quiet".to_string(),
            eval_weights: EvalWeights::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a simple `key: value` line-oriented file. Missing file, unreadable
    /// file, or any individual unparsable line all fall back to defaults for the affected field —
    /// never a hard error (see §7, configuration load failure is a warning, not an abort).
    ///
    /// Recognized keys: `max_depth`, `time_ms` (`none`/`null` disables), `tt_mb`, `quiescence`,
    /// `ordering`, `logging.emit_pv`, `logging.emit_depth_log`. Unrecognized keys are ignored.
    pub fn load(path: &str) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => return Self::default(),
        };

        let mut config = Self::default();
        let mut fields = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                fields.insert(key.trim().to_string(), value.trim().to_string());
            } else {
                eprintln!("# Warning: ignoring malformed config line: {}", line);
            }
        }

        if let Some(v) = fields.get("max_depth") {
            match v.parse() {
                Ok(d) => config.max_depth = d,
                Err(_) => eprintln!("# Warning: invalid max_depth {:?}, using default", v),
            }
        }
        if let Some(v) = fields.get("time_ms") {
            if v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("null") {
                config.time_ms = None;
            } else {
                match v.parse() {
                    Ok(ms) => config.time_ms = Some(ms),
                    Err(_) => eprintln!("# Warning: invalid time_ms {:?}, using default", v),
                }
            }
        }
        if let Some(v) = fields.get("tt_mb") {
            match v.parse() {
                Ok(mb) => config.tt_mb = mb,
                Err(_) => eprintln!("# Warning: invalid tt_mb {:?}, using default", v),
            }
        }
        if let Some(v) = fields.get("quiescence") {
            match v.parse() {
                Ok(b) => config.quiescence = b,
                Err(_) => eprintln!("# Warning: invalid quiescence {:?}, using default", v),
            }
        }
        if let Some(v) = fields.get("ordering") {
            config.ordering = v.clone();
        }
        if let Some(v) = fields.get("logging.emit_pv") {
            match v.parse() {
                Ok(b) => config.logging.emit_pv = b,
                Err(_) => eprintln!("# Warning: invalid logging.emit_pv {:?}, using default", v),
            }
        }
        if let Some(v) = fields.get("logging.emit_depth_log") {
            match v.parse() {
                Ok(b) => config.logging.emit_depth_log = b,
                Err(_) => eprintln!("# Warning: invalid logging.emit_depth_log {:?}, using default", v),
            }
        }

        config
    }
}
