//! Deciding which revision fields to send, and what to warn about.

use reqwest::Url;

use crate::conduit::{revision_url, RepositoryInfo, Reviewer, Revision, Transaction, TransactionKind, TransactionValue};
use crate::meta::record::{Label, MetaRecord, Plan};
use crate::vcs::RemoteVcs;

/// Plans revision edits for enriched records.
pub struct Planner<'a> {
    repository: &'a RepositoryInfo,
    phabricator: &'a Url,
}

impl<'a> Planner<'a> {
    pub fn new(repository: &'a RepositoryInfo, phabricator: &'a Url) -> Self {
        Self {
            repository,
            phabricator,
        }
    }

    /// Fill in every record's plan.
    pub fn plan_all(&self, records: &mut [MetaRecord]) {
        for idx in 0..records.len() {
            let record = &records[idx];
            let predecessor = record.predecessor.and_then(|p| records.get(p));
            let plan = self.plan(record, predecessor);
            records[idx].plan = plan;
        }
    }

    /// Plan one record. `predecessor` is the record of the commit below it
    /// in the push, if that commit is part of the push.
    pub fn plan(&self, record: &MetaRecord, predecessor: Option<&MetaRecord>) -> Plan {
        let mut plan = Plan::default();

        if record.diff.source_control_system == RemoteVcs::Hg.as_str() {
            let parent = record.base_id.get(..12).unwrap_or(&record.base_id);
            plan.labels.push(Label::new(
                "Hg Changeset",
                format!("{} (parent={parent})", record.remote_id),
            ));
        }

        match &record.revision {
            None => {
                plan.transactions
                    .push(Transaction::text(TransactionKind::Repository, &self.repository.phid));
                plan.labels.push(Label::new(
                    "New Revision",
                    format!("<repo: {}>", self.repository.fields.name),
                ));
            }
            Some(revision) => {
                plan.labels
                    .push(Label::new("Update Rev.", revision_url(self.phabricator, revision.id)));
            }
        }

        let (files, additions, deletions) = record.diff.stat();
        plan.labels.push(Label::new(
            "Changes",
            format!("{files} file(s) (+{additions}, -{deletions})"),
        ));
        if !record.uploads.is_empty() {
            plan.labels
                .push(Label::new("Upload", format!("{} binaries", record.uploads.len())));
        }

        match &record.revision {
            None => plan_create(record, &mut plan),
            Some(revision) => plan_update(record, revision, predecessor, &mut plan),
        }

        let to_add: Vec<&Reviewer> = match &record.revision {
            None => record.reviewers.iter().collect(),
            Some(revision) => record
                .reviewers
                .iter()
                .filter(|r| !revision.has_reviewer(&r.phid))
                .collect(),
        };
        if !to_add.is_empty() {
            plan.transactions.push(Transaction::list(
                TransactionKind::ReviewersAdd,
                to_add.iter().map(|r| r.phid.clone()).collect(),
            ));
            let names: Vec<String> = to_add.iter().map(|r| r.display_name()).collect();
            plan.labels.push(Label::new("Add Reviewer", names.join(", ")));
        } else if record.revision.is_none() {
            plan.warnings.push("no reviewers specified".to_string());
        }

        plan
    }
}

fn plan_create(record: &MetaRecord, plan: &mut Plan) {
    plan.transactions
        .push(Transaction::text(TransactionKind::Title, &record.new_title));
    plan.labels.push(Label::new("Title", &record.new_title));

    if !record.new_summary.is_empty() {
        plan.transactions
            .push(Transaction::text(TransactionKind::Summary, &record.new_summary));
        plan.labels.push(Label::with_body("Summary", &record.new_summary));
    }

    match &record.bug {
        Some(bug) => {
            plan.transactions
                .push(Transaction::text(TransactionKind::BugId, bug.id.to_string()));
            plan.labels.push(Label::new(
                "Bug",
                format!("Bug {} [{}] {}", bug.id, bug.status, bug.summary),
            ));
        }
        None => plan.warnings.push("no bug # specified".to_string()),
    }
}

fn plan_update(record: &MetaRecord, revision: &Revision, predecessor: Option<&MetaRecord>, plan: &mut Plan) {
    if record.new_title != revision.fields.title {
        plan.transactions
            .push(Transaction::text(TransactionKind::Title, &record.new_title));
        plan.labels.push(Label::new("New Title", &record.new_title));
    }

    if let Some(old_depend) = record.old_depend {
        match predecessor {
            None => plan
                .warnings
                .push(format!("current parent D{old_depend} not in push")),
            Some(prev) if prev.revision_id() != Some(old_depend) => plan
                .warnings
                .push(format!("can't change revision D{} dependency", revision.id)),
            Some(_) => {}
        }
    }

    if record.old_summary.as_deref() != Some(record.new_summary.as_str()) {
        plan.transactions
            .push(Transaction::text(TransactionKind::Summary, &record.new_summary));
        plan.labels.push(Label::with_body("New Summary", &record.new_summary));
    }

    let stored = revision.stored_bug();
    match &record.bug {
        Some(bug) => {
            let id = bug.id.to_string();
            if stored != Some(id.as_str()) {
                plan.warnings
                    .push(format!("bug mismatch ({id} != {})", stored.unwrap_or("none")));
            }
        }
        None => {
            if let Some(stored) = stored {
                plan.warnings
                    .push(format!("no bug # specified (revision has bug {stored})"));
            }
        }
    }
}

/// Point every summary transaction at revision `D<depends_on>`.
pub fn inject_dependency(transactions: &mut [Transaction], depends_on: u64) {
    for txn in transactions {
        if txn.kind != TransactionKind::Summary {
            continue;
        }
        if let TransactionValue::Text(summary) = &mut txn.value {
            summary.push_str(&format!("\n\nDepends on D{depends_on}"));
            *summary = summary.trim().to_string();
        }
    }
}
