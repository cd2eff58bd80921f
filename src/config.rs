use std::env;

use chrono::NaiveDate;

use crate::types::RunMode;

const DEFAULT_BOOKMAKERS: &[&str] = &["bet365", "williamhill", "skybet", "paddypower", "betfair"];

/// Decimal-odds boundaries for the risk tiers. Fixed product constants,
/// overridable per deployment but never inferred from data.
#[derive(Debug, Clone, Copy)]
pub struct TierThresholds {
    pub par_max: f64,
    pub birdie_max: f64,
    pub long_shot_min: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            par_max: 6.0,
            birdie_max: 11.0,
            long_shot_min: 61.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub iterations: u32,
    pub seed: u64,
    /// Players (plus ties) surviving the round-2 cut.
    pub cut_size: usize,
    /// Below this iteration count a simulated probability cannot reach the
    /// highest confidence band.
    pub confidence_floor: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            seed: 20_26,
            cut_size: 65,
            confidence_floor: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionPolicy {
    pub min_picks_per_tier: usize,
    pub max_picks_per_tier: usize,
    pub allow_fallback: bool,
    /// A run with fewer total picks than this is marked failed.
    pub min_total_picks: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_picks_per_tier: 1,
            max_picks_per_tier: 3,
            allow_fallback: true,
            min_total_picks: 1,
        }
    }
}

/// Everything a pipeline run needs to know, resolved once up front.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: RunMode,
    /// Anchor date for backfill mode; ignored for current-week runs.
    pub backfill_date: Option<NaiveDate>,
    /// Raw configured tour codes; resolved (and unknown codes reported) at
    /// the start of each run.
    pub tour_codes: Vec<String>,
    pub dry_run: bool,
    /// Lowercased bookmaker keys eligible for best-price selection.
    pub bookmakers: Vec<String>,
    pub tiers: TierThresholds,
    pub simulation: SimulationConfig,
    pub selection: SelectionPolicy,
    pub fetch_parallelism: usize,
    pub max_run_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::CurrentWeek,
            backfill_date: None,
            tour_codes: vec!["pga".to_string(), "dpwt".to_string()],
            dry_run: false,
            bookmakers: DEFAULT_BOOKMAKERS.iter().map(|s| s.to_string()).collect(),
            tiers: TierThresholds::default(),
            simulation: SimulationConfig::default(),
            selection: SelectionPolicy::default(),
            fetch_parallelism: 6,
            max_run_secs: 600,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mode = env::var("RUN_MODE")
            .map(|v| RunMode::parse(&v))
            .unwrap_or(defaults.mode);
        let backfill_date = env::var("BACKFILL_DATE")
            .ok()
            .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok());

        let tour_codes = env::var("TOURS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.tour_codes);

        let bookmakers = env::var("BOOKMAKERS")
            .ok()
            .map(|raw| parse_bookmaker_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.bookmakers);

        let tiers = TierThresholds {
            par_max: env_f64("TIER_PAR_MAX", defaults.tiers.par_max),
            birdie_max: env_f64("TIER_BIRDIE_MAX", defaults.tiers.birdie_max),
            long_shot_min: env_f64("TIER_LONG_SHOT_MIN", defaults.tiers.long_shot_min),
        };

        let simulation = SimulationConfig {
            iterations: env_u64("SIM_ITERATIONS", defaults.simulation.iterations as u64)
                .clamp(100, 1_000_000) as u32,
            seed: env_u64("SIM_SEED", defaults.simulation.seed),
            cut_size: env_u64("SIM_CUT_SIZE", defaults.simulation.cut_size as u64)
                .clamp(10, 200) as usize,
            confidence_floor: env_u64(
                "SIM_CONFIDENCE_FLOOR",
                defaults.simulation.confidence_floor as u64,
            ) as u32,
        };

        let selection = SelectionPolicy {
            min_picks_per_tier: env_u64(
                "MIN_PICKS_PER_TIER",
                defaults.selection.min_picks_per_tier as u64,
            )
            .clamp(0, 10) as usize,
            max_picks_per_tier: env_u64(
                "MAX_PICKS_PER_TIER",
                defaults.selection.max_picks_per_tier as u64,
            )
            .clamp(1, 25) as usize,
            allow_fallback: env_bool("ALLOW_FALLBACK", defaults.selection.allow_fallback),
            min_total_picks: env_u64(
                "MIN_TOTAL_PICKS",
                defaults.selection.min_total_picks as u64,
            ) as usize,
        };

        Self {
            mode,
            backfill_date,
            tour_codes,
            dry_run: env_bool("DRY_RUN", false),
            bookmakers,
            tiers,
            simulation,
            selection,
            fetch_parallelism: env_u64("FETCH_PARALLELISM", defaults.fetch_parallelism as u64)
                .clamp(2, 32) as usize,
            max_run_secs: env_u64("MAX_RUN_SECS", defaults.max_run_secs).clamp(30, 7200),
        }
    }

    pub fn bookmaker_allowed(&self, bookmaker: &str) -> bool {
        let key = bookmaker.trim().to_ascii_lowercase();
        self.bookmakers.iter().any(|b| *b == key)
    }
}

fn parse_bookmaker_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    out.dedup();
    out
}

pub fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}
