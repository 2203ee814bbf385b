//! `payee duplicates` - duplicate-entity detection over original payee spellings.

use std::path::{Path, PathBuf};

use payeekit_core::CancelToken;
use payeekit_dedup::{
    detect_duplicates, detect_duplicates_algorithmic, DuplicateRecord, DuplicateReport,
};
use payeekit_recon::create_row_mapping;
use serde::Serialize;

use crate::table::{emit_json, read_csv};
use crate::{load_settings, oracle_client, CliError};

#[derive(Serialize)]
struct DuplicatesOutput<'a> {
    generated_at: String,
    input: String,
    payee_column: &'a str,
    ai_enabled: bool,
    #[serde(flatten)]
    report: &'a DuplicateReport,
}

pub fn cmd_duplicates(
    config: Option<&Path>,
    input: &Path,
    column: &str,
    no_ai: bool,
    json: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let mut dup_config = settings.duplicates.clone();
    if no_ai {
        dup_config.ai_enabled = false;
    }

    let rows = read_csv(input)?;
    let data = create_row_mapping(rows, column).map_err(CliError::recon)?;
    let records = DuplicateRecord::from_names(&data.unique_original_names());
    log::info!("checking {} distinct payee spellings for duplicates", records.len());

    let report = if dup_config.ai_enabled {
        let judge = oracle_client(&settings)
            .map_err(|e| e.with_hint("pass --no-ai to resolve ambiguous pairs without the AI judge"))?;
        let cancel = CancelToken::new();
        smol::block_on(detect_duplicates(&records, &judge, &dup_config, &cancel))
    } else {
        detect_duplicates_algorithmic(&records, &dup_config)
    }
    .map_err(CliError::dedup)?;

    let out = DuplicatesOutput {
        generated_at: chrono::Utc::now().to_rfc3339(),
        input: input.display().to_string(),
        payee_column: &data.payee_column,
        ai_enabled: dup_config.ai_enabled,
        report: &report,
    };
    emit_json(&out, json, output.as_ref())?;

    if !json {
        let stats = &report.statistics;
        eprintln!(
            "{} names, {} pairs scored, {} duplicate groups ({} AI judgments, {} failed)",
            stats.records_processed,
            stats.candidate_pairs,
            stats.groups,
            stats.ai_judgments,
            stats.ai_failures,
        );
        for group in &report.duplicate_groups {
            let names: Vec<&str> = group.members.iter().map(|m| m.name.as_str()).collect();
            eprintln!("  group {}: {}", group.group_id + 1, names.join(" | "));
        }
    }
    Ok(())
}
