//! Engine seams backed by the blocking client.

use payeekit_core::{CallError, CancelToken};
use payeekit_dedup::{DuplicateJudge, JudgeVerdict};
use payeekit_recon::{ClassificationOracle, ClassificationResult};

use crate::client::OracleClient;

impl ClassificationOracle for OracleClient {
    async fn classify(&self, names: &[String]) -> Result<Vec<ClassificationResult>, CallError> {
        let client = self.clone();
        let names = names.to_vec();
        // Dropping this future (attempt timeout, caller cancel) aborts the job.
        let abort = CancelToken::new();
        let _guard = abort.clone().drop_guard();
        smol::unblock(move || client.classify_until(&names, &abort))
            .await
            .map_err(CallError::from)
    }
}

impl DuplicateJudge for OracleClient {
    async fn judge(&self, name_a: &str, name_b: &str) -> Result<JudgeVerdict, CallError> {
        let client = self.clone();
        let (a, b) = (name_a.to_string(), name_b.to_string());
        smol::unblock(move || client.judge_blocking(&a, &b))
            .await
            .map_err(CallError::from)
    }
}
