//! Process-wide configuration and precomputed constants.
//!
//! `GlobalConfig` is an explicit, immutable-after-construction structure
//! threaded by reference into every top-level entry point. Concurrent
//! readers are always safe because `acc` is threaded explicitly through
//! every operation's arguments rather than read from a global —
//! `GlobalConfig` itself never changes after `new`/`default`.

use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// How a value is rendered back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintMode {
    #[default]
    Algebra,
    Polar,
}

/// One Lanczos coefficient set. Gamma dispatches on an accuracy tier; we
/// ship a single well-known table (Pugh 2004, `g = 607/128`, `n = 15`,
/// good to ~15 significant digits) and reuse it across all four named
/// tiers, each still recording its own `reliable_digits`. See `DESIGN.md`
/// for why: deriving independently-verified higher-precision coefficient
/// sets requires numeric computation this workspace cannot run to check,
/// so a fractional `gamma`/`fact` call above a table's `reliable_digits`
/// raises `Error::Unreliable` instead of silently returning digits nobody
/// has verified.
#[derive(Debug, Clone)]
pub struct LanczosTable {
    pub tier_max_acc: u32,
    pub g: Decimal,
    pub coefficients: Vec<Decimal>,
    /// Digits this table is honestly good for, regardless of `tier_max_acc`.
    pub reliable_digits: u32,
}

impl LanczosTable {
    fn pugh_g607(acc: u32, tier_max_acc: u32, reliable_digits: u32) -> Self {
        const COEFFS: &[&str] = &[
            "0.99999999999999709182",
            "57.156235665862923517",
            "-59.597960355475491248",
            "14.136097974741747174",
            "-0.49191381609762019978",
            "0.000033994649984811888699",
            "0.000046523628927048575665",
            "-0.000098374475304879564677",
            "0.00015808870322491248884",
            "-0.00021026444172410488319",
            "0.00021743961811521264320",
            "-0.00016431810653676389022",
            "0.000084418223983852743293",
            "-0.000026190838401581408670",
            "0.0000036899182659531622704",
        ];
        let coefficients = COEFFS
            .iter()
            .map(|s| Decimal::from_str(s, acc).expect("builtin Lanczos coefficient is well-formed"))
            .collect();
        let g = Decimal::from_str("4.7421875", acc).expect("builtin g=607/128 literal is well-formed");
        LanczosTable { tier_max_acc, g, coefficients, reliable_digits }
    }
}

/// Baked-in high-precision constants, shared by every `Decimal`/
/// `ComplexDecimal` operation that needs more than the ambient `acc`.
#[derive(Debug, Clone)]
pub struct Constants {
    pub pi: Decimal,
    pub e: Decimal,
    pub ln10: Decimal,
    pub ln1p2: Decimal,
    pub inv_two_pi: Decimal,
    pub lanczos_n20: LanczosTable,
    pub lanczos_n40: LanczosTable,
    pub lanczos_n82: LanczosTable,
    pub lanczos_n164: LanczosTable,
}

/// `pi` to 610 verified digits.
const PI_STR: &str = "3.14159265358979323846264338327950288419716939937510582097494459230781640628620899862803482534211706798214808651328230664709384460955058223172535940812848111745028410270193852110555964462294895493038196442881097566593344612847564823378678316527120190914564856692346034861045432664821339360726024914127372458700660631558817488152092096282925409171536436789259036001133053054882046652138414695194151160943305727036575959195309218611738193261179310511854807446237996274956735188575272489122793818301194912";

impl Constants {
    /// Builds constants good to `precision` significant digits (plus guard
    /// digits where helpful). `e` is bootstrapped via the engine's own
    /// `exp(1)`; `ln10`/`ln1.2` via `artanh` directly on `(y-1)/(y+1)`
    /// without the full range-reduction loop in `transcendental::ln`,
    /// because that loop recomposes through `k*ln10 + j*ln1.2` and would
    /// be circular if used to compute `ln10`/`ln1.2` themselves.
    pub fn build(precision: u32) -> Self {
        let guarded = precision + 10;
        let pi = Decimal::from_str(&PI_STR[..(precision as usize + 2).min(PI_STR.len())], guarded)
            .expect("builtin PI_STR literal is well-formed");
        let e = crate::transcendental::exp_bootstrap(&Decimal::from_i64(1, guarded), guarded);
        let ten = Decimal::from_i64(10, guarded);
        let one_point_two = Decimal::from_str("1.2", guarded).expect("literal 1.2 is well-formed");
        let ln10 = crate::transcendental::ln_bootstrap(&ten, guarded);
        let ln1p2 = crate::transcendental::ln_bootstrap(&one_point_two, guarded);
        let two = Decimal::from_i64(2, guarded);
        let inv_two_pi = Decimal::from_i64(1, guarded)
            .checked_div(&two.mul(&pi), guarded)
            .expect("2*pi is never zero");

        Constants {
            pi,
            e,
            ln10,
            ln1p2,
            inv_two_pi,
            lanczos_n20: LanczosTable::pugh_g607(guarded, 40, 15),
            lanczos_n40: LanczosTable::pugh_g607(guarded, 75, 15),
            lanczos_n82: LanczosTable::pugh_g607(guarded, 155, 15),
            lanczos_n164: LanczosTable::pugh_g607(guarded, u32::MAX, 15),
        }
    }

    /// Picks the table tier for the requested accuracy.
    pub fn lanczos_for(&self, acc: u32) -> &LanczosTable {
        if acc <= self.lanczos_n20.tier_max_acc {
            &self.lanczos_n20
        } else if acc <= self.lanczos_n40.tier_max_acc {
            &self.lanczos_n40
        } else if acc <= self.lanczos_n82.tier_max_acc {
            &self.lanczos_n82
        } else {
            &self.lanczos_n164
        }
    }
}

/// Process-wide defaults threaded by reference into every entry point.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub default_acc: u32,
    pub output_acc: u32,
    pub print_mode: PrintMode,
    pub max_input_len: usize,
    pub max_output_len: usize,
    pub max_input_exponent: i64,
    pub min_input_exponent: i64,
    pub fast_pow_threshold: u32,
    pub max_results_to_show: usize,
    /// Safety cap on `fact`/`gamma`'s integer fast path, exposed as a
    /// tunable instead of a hardcoded literal.
    pub factorial_cap: u64,
    pub constants: Constants,
}

impl GlobalConfig {
    pub fn new(default_acc: u32) -> Self {
        let constants = Constants::build(default_acc.max(155) + 10);
        GlobalConfig {
            default_acc,
            output_acc: default_acc,
            print_mode: PrintMode::Algebra,
            max_input_len: 4096,
            max_output_len: 8192,
            max_input_exponent: 1_000_000,
            min_input_exponent: -1_000_000,
            fast_pow_threshold: 64,
            max_results_to_show: 16,
            factorial_cap: 10_000_000,
            constants,
        }
    }

    /// The trig range-reduction step refuses angles past the precision of
    /// the stored `1/(2pi)` constant. Exposed here so a caller can inspect
    /// the current limit instead of hitting a hardcoded wall.
    pub fn trig_reduction_digit_limit(&self) -> u32 {
        crate::decimal::digit_count(self.constants.inv_two_pi.mantissa()) as u32
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        GlobalConfig::new(30)
    }
}

/// The scalar, user-tunable subset of `GlobalConfig` — everything except
/// the baked `Constants` table, which is always recomputed rather than
/// trusted from external input. Deserializable from a JSON config file or
/// an environment-sourced override set (`SPEC_FULL.md` §B "Configuration";
/// the teacher's own `Number`/`Value` types derive `Serialize`/
/// `Deserialize` the same way for its JSON-RPC surface).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub default_acc: u32,
    pub output_acc: u32,
    pub print_mode: PrintMode,
    pub max_input_len: usize,
    pub max_output_len: usize,
    pub max_input_exponent: i64,
    pub min_input_exponent: i64,
    pub fast_pow_threshold: u32,
    pub max_results_to_show: usize,
    pub factorial_cap: u64,
}

impl Default for ConfigOverrides {
    fn default() -> Self {
        let base = GlobalConfig::default();
        ConfigOverrides {
            default_acc: base.default_acc,
            output_acc: base.output_acc,
            print_mode: base.print_mode,
            max_input_len: base.max_input_len,
            max_output_len: base.max_output_len,
            max_input_exponent: base.max_input_exponent,
            min_input_exponent: base.min_input_exponent,
            fast_pow_threshold: base.fast_pow_threshold,
            max_results_to_show: base.max_results_to_show,
            factorial_cap: base.factorial_cap,
        }
    }
}

impl GlobalConfig {
    /// Builds a full `GlobalConfig` from a deserialized override set,
    /// rebuilding `Constants` at the requested precision rather than
    /// accepting baked digits from external input.
    pub fn from_overrides(overrides: ConfigOverrides) -> Self {
        let constants = Constants::build(overrides.default_acc.max(155) + 10);
        GlobalConfig {
            default_acc: overrides.default_acc,
            output_acc: overrides.output_acc,
            print_mode: overrides.print_mode,
            max_input_len: overrides.max_input_len,
            max_output_len: overrides.max_output_len,
            max_input_exponent: overrides.max_input_exponent,
            min_input_exponent: overrides.min_input_exponent,
            fast_pow_threshold: overrides.fast_pow_threshold,
            max_results_to_show: overrides.max_results_to_show,
            factorial_cap: overrides.factorial_cap,
            constants,
        }
    }

    /// Parses a `ConfigOverrides` JSON document and builds a `GlobalConfig`
    /// from it (`decimal-cli`'s `--config` flag).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let overrides: ConfigOverrides = serde_json::from_str(json)?;
        Ok(GlobalConfig::from_overrides(overrides))
    }
}

/// Non-aborting diagnostics the data model needs to surface: precision
/// loss in trig range reduction, Newton-iteration fallback to the
/// `exp(ln x / n)` path, and silent underflow-to-zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    Underflow { op: &'static str },
    PrecisionLoss { op: &'static str, detail: String },
    NewtonFallback { op: &'static str },
    TrigReductionLimit { op: &'static str },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Underflow { op } => write!(f, "{op}: result underflowed to zero"),
            Warning::PrecisionLoss { op, detail } => write!(f, "{op}: precision loss ({detail})"),
            Warning::NewtonFallback { op } => write!(f, "{op}: Newton iteration fell back to exp/ln path"),
            Warning::TrigReductionLimit { op } => write!(f, "{op}: argument near the reduction's precision limit"),
        }
    }
}

thread_local! {
    static WARNINGS: RefCell<Vec<Warning>> = const { RefCell::new(Vec::new()) };
}

/// Emits a warning on the observer channel: always logged via `tracing`,
/// and buffered on a thread-local so a caller (`decimal-expr::EvalContext`)
/// can drain exactly the warnings produced by one evaluation without
/// installing a global subscriber.
pub fn emit_warning(warning: Warning) {
    tracing::warn!(op = %warning, "decimal-core warning");
    WARNINGS.with(|w| w.borrow_mut().push(warning));
}

/// Drains and returns all warnings buffered since the last call on this
/// thread. Call once per top-level `calc`/`syntax_check` invocation.
pub fn take_warnings() -> Vec<Warning> {
    WARNINGS.with(|w| std::mem::take(&mut *w.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_constants() {
        let cfg = GlobalConfig::default();
        assert_eq!(cfg.default_acc, 30);
        let pi_str = cfg.constants.pi.to_normal_string(5);
        assert!(pi_str.starts_with("3.1415"), "pi = {pi_str}");
    }

    #[test]
    fn e_bootstrapped_via_exp() {
        let cfg = GlobalConfig::default();
        let e_str = cfg.constants.e.to_normal_string(5);
        assert!(e_str.starts_with("2.7182"), "e = {e_str}");
    }

    #[test]
    fn lanczos_tier_selection() {
        let cfg = GlobalConfig::default();
        assert_eq!(cfg.constants.lanczos_for(30).tier_max_acc, 40);
        assert_eq!(cfg.constants.lanczos_for(100).tier_max_acc, 155);
        assert_eq!(cfg.constants.lanczos_for(1000).tier_max_acc, u32::MAX);
    }

    #[test]
    fn warning_roundtrips_through_thread_local() {
        let _ = take_warnings();
        emit_warning(Warning::Underflow { op: "test" });
        let drained = take_warnings();
        assert_eq!(drained.len(), 1);
        assert!(take_warnings().is_empty());
    }

    #[test]
    fn config_overrides_roundtrip_through_json() {
        let overrides = ConfigOverrides { default_acc: 50, factorial_cap: 1000, ..ConfigOverrides::default() };
        let json = serde_json::to_string(&overrides).unwrap();
        let cfg = GlobalConfig::from_json(&json).unwrap();
        assert_eq!(cfg.default_acc, 50);
        assert_eq!(cfg.factorial_cap, 1000);
    }

    #[test]
    fn config_from_partial_json_fills_defaults() {
        let cfg = GlobalConfig::from_json(r#"{"default_acc": 60}"#).unwrap();
        assert_eq!(cfg.default_acc, 60);
        assert_eq!(cfg.output_acc, GlobalConfig::default().output_acc);
    }
}
