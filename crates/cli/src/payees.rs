//! `payee standardize`, `payee map` and `payee classify`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use payeekit_core::{CacheService, CancelToken, FileTtlCache, Progress};
use payeekit_recon::evidence::compute_summary;
use payeekit_recon::model::{ReconcileSummary, StandardizationStats};
use payeekit_recon::{
    classify_payees, create_row_mapping, create_row_mapping_cooperative, reconcile_cooperative,
    standardize, ClassificationResult, MappedRow, PayeeRowData, StandardizationResult,
};
use serde::Serialize;

use crate::exit_codes::EXIT_CLASSIFY_FAILED_ROWS;
use crate::table::{emit_json, read_csv};
use crate::{load_settings, oracle_client, CliError};

// ============================================================================
// standardize
// ============================================================================

pub fn cmd_standardize(names: Vec<String>, json: bool) -> Result<(), CliError> {
    let results: Vec<StandardizationResult> =
        names.iter().map(|name| standardize(Some(name))).collect();

    if json {
        return emit_json(&results, true, None);
    }
    for r in &results {
        let steps: Vec<&str> = r.cleaning_steps.iter().map(|s| s.as_str()).collect();
        if steps.is_empty() {
            println!("{} -> {}", r.original, r.normalized);
        } else {
            println!("{} -> {}  [{}]", r.original, r.normalized, steps.join(", "));
        }
    }
    Ok(())
}

// ============================================================================
// map
// ============================================================================

#[derive(Serialize)]
struct UniquePayee<'a> {
    index: usize,
    original: &'a str,
    normalized: &'a str,
    rows: usize,
}

#[derive(Serialize)]
struct MapReport<'a> {
    payee_column: &'a str,
    row_count: usize,
    unique_count: usize,
    standardization_stats: &'a StandardizationStats,
    unique_payees: Vec<UniquePayee<'a>>,
}

impl<'a> MapReport<'a> {
    fn new(data: &'a PayeeRowData) -> Self {
        let mut rows_per_payee: BTreeMap<usize, usize> = BTreeMap::new();
        for m in &data.row_mappings {
            *rows_per_payee.entry(m.unique_payee_index).or_default() += 1;
        }
        let unique_payees = data
            .unique_payee_names
            .iter()
            .zip(&data.unique_normalized_names)
            .enumerate()
            .map(|(index, (original, normalized))| UniquePayee {
                index,
                original,
                normalized,
                rows: rows_per_payee.get(&index).copied().unwrap_or(0),
            })
            .collect();

        Self {
            payee_column: &data.payee_column,
            row_count: data.row_count(),
            unique_count: data.unique_count(),
            standardization_stats: &data.standardization_stats,
            unique_payees,
        }
    }
}

pub fn cmd_map(input: &Path, column: &str, json: bool, output: Option<PathBuf>) -> Result<(), CliError> {
    let rows = read_csv(input)?;
    let data = create_row_mapping(rows, column).map_err(CliError::recon)?;
    let report = MapReport::new(&data);

    emit_json(&report, json, output.as_ref())?;
    if !json {
        let stats = &data.standardization_stats;
        eprintln!(
            "{} rows -> {} unique payees ({:.1}% of names changed, {:.1} steps per name)",
            report.row_count,
            report.unique_count,
            stats.fraction_changed * 100.0,
            stats.average_steps,
        );
        for step in &stats.top_steps {
            eprintln!("  {:<32} {}", step.step.as_str(), step.count);
        }
    }
    Ok(())
}

// ============================================================================
// classify
// ============================================================================

#[derive(Serialize)]
struct ClassifyReport<'a> {
    generated_at: String,
    input: String,
    payee_column: &'a str,
    unique_payees: usize,
    summary: ReconcileSummary,
    rows: &'a [MappedRow],
}

fn log_progress(stage: &'static str) -> impl FnMut(Progress) {
    move |p: Progress| log::debug!("{stage}: {}/{} ({:.0}%)", p.processed, p.total, p.percent)
}

pub fn cmd_classify(
    config: Option<&Path>,
    input: &Path,
    column: &str,
    json: bool,
    output: Option<PathBuf>,
    strict: bool,
    no_cache: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let rows = read_csv(input)?;
    let cancel = CancelToken::new();
    let oracle = oracle_client(&settings)?.with_cancel(cancel.clone());

    let cache = (settings.cache.enabled && !no_cache)
        .then(|| FileTtlCache::<ClassificationResult>::load(settings.cache.file(), settings.cache.ttl()));
    let cache_ref = cache.as_ref().map(|c| c as &dyn CacheService<ClassificationResult>);

    let (data, mapped) = smol::block_on(async {
        let data = create_row_mapping_cooperative(rows, column, log_progress("mapping"), &cancel)
            .await
            .map_err(CliError::recon)?;
        let results = classify_payees(&data, &oracle, cache_ref, &settings.classification, &cancel)
            .await
            .map_err(CliError::recon)?;
        let mapped = reconcile_cooperative(&results, &data, log_progress("reconciling"), &cancel)
            .await
            .map_err(CliError::recon)?;
        Ok::<_, CliError>((data, mapped))
    })?;

    if let Some(cache) = &cache {
        if let Err(e) = cache.flush() {
            log::warn!("could not write classification cache {}: {e}", cache.path().display());
        }
    }

    let summary = compute_summary(&mapped);
    let report = ClassifyReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        input: input.display().to_string(),
        payee_column: &data.payee_column,
        unique_payees: data.unique_count(),
        summary,
        rows: &mapped,
    };
    emit_json(&report, json, output.as_ref())?;

    let summary = &report.summary;
    if !json {
        eprintln!(
            "{} rows: {} business, {} individual, {} failed ({} from cache), mean confidence {:.1}",
            summary.total_rows,
            summary.business,
            summary.individual,
            summary.failed,
            summary.cached,
            summary.average_confidence,
        );
    }

    if strict && summary.failed > 0 {
        return Err(CliError::new(
            EXIT_CLASSIFY_FAILED_ROWS,
            format!("{} of {} rows failed classification", summary.failed, summary.total_rows),
        )
        .with_hint("failed rows carry classification_error in the output"));
    }
    Ok(())
}
