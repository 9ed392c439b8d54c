//! Reference audit and repair.

use crate::repo::consistency_repo::{ConsistencyRepository, Inconsistency};
use crate::service::ServiceResult;
use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub fixed: Vec<Inconsistency>,
    /// Findings still present after the repair pass.
    pub remaining: Vec<Inconsistency>,
}

pub struct ConsistencyService<C: ConsistencyRepository> {
    repo: C,
}

impl<C: ConsistencyRepository> ConsistencyService<C> {
    pub fn new(repo: C) -> Self {
        Self { repo }
    }

    pub fn audit(&self) -> ServiceResult<Vec<Inconsistency>> {
        let findings = self.repo.scan()?;
        if findings.is_empty() {
            info!("event=consistency_audit module=service status=ok findings=0");
        } else {
            warn!(
                "event=consistency_audit module=service status=findings findings={}",
                findings.len()
            );
        }
        Ok(findings)
    }

    pub fn repair(&self) -> ServiceResult<RepairReport> {
        let fixed = self.repo.repair()?;
        let remaining = self.repo.scan()?;
        info!(
            "event=consistency_repair module=service status=ok fixed={} remaining={}",
            fixed.len(),
            remaining.len()
        );
        Ok(RepairReport { fixed, remaining })
    }
}
