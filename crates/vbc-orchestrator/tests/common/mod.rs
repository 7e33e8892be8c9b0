#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use jiff::civil::date;
use tokio::sync::{Notify, Semaphore};
use vbc_core::Period;
use vbc_core::models::claim::{MedicalClaim, PharmacyClaim};
use vbc_core::models::contract::ContractParams;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::member::{Gender, Member};
use vbc_core::models::quality_measure::{MeasureCategory, QualityMeasure};
use vbc_core::models::workflow::{WorkflowRequest, WorkflowState};
use vbc_export::{Artifact, ExportError, Renderer, WorkflowSummary};
use vbc_orchestrator::{
    BoxFuture, DataSource, MemoryStateStore, Orchestrator, OrchestratorError, RetryPolicy,
    Snapshot, StateStore,
};

pub const CONTRACT: &str = "ACO-TEST";

pub fn period() -> Period {
    Period { year: 2024, month: 6 }
}

pub fn request() -> WorkflowRequest {
    WorkflowRequest {
        contract_id: CONTRACT.to_string(),
        period: period(),
    }
}

pub fn member(id: usize) -> Member {
    Member {
        member_id: format!("M{id:04}"),
        first_name: Some("Pat".to_string()),
        last_name: Some(format!("Member{id}")),
        date_of_birth: Some(date(1950, 1, 1)),
        gender: Some(if id % 2 == 0 { Gender::Female } else { Gender::Male }),
        attribution_start: Some(date(2024, 1, 1)),
        attribution_end: None,
        pcp_id: Some("P1".to_string()),
        hcc_risk_score: Some(1.0),
        risk_category: None,
    }
}

fn medical(id: usize, member: usize) -> MedicalClaim {
    MedicalClaim {
        claim_id: format!("C{id:05}"),
        member_id: format!("M{member:04}"),
        service_date: Some(date(2024, 3, 10)),
        paid_date: Some(date(2024, 4, 2)),
        paid_amount: Some(250.0),
        allowed_amount: Some(300.0),
        primary_diagnosis: Some("E11.9".to_string()),
        place_of_service: Some("11".to_string()),
        er_visit: false,
        inpatient_admit: false,
    }
}

fn pharmacy(id: usize, member: usize) -> PharmacyClaim {
    PharmacyClaim {
        claim_id: format!("RX{id:05}"),
        member_id: format!("M{member:04}"),
        fill_date: Some(date(2024, 2, 14)),
        paid_amount: Some(42.5),
        drug_name: Some("metformin".to_string()),
        generic: true,
        days_supply: Some(30),
    }
}

fn measure(id: &str, category: MeasureCategory) -> QualityMeasure {
    QualityMeasure {
        measure_id: id.to_string(),
        name: Some(format!("Measure {id}")),
        category: Some(category),
        numerator: 85,
        denominator: 100,
        exclusions: 0,
        benchmark: Some(75.0),
        weight: 1.0,
        period: period(),
    }
}

/// Passes every validation rule.
pub fn clean_dataset() -> Dataset {
    Dataset {
        members: (0..20).map(member).collect(),
        medical_claims: (0..200).map(|i| medical(i, i % 20)).collect(),
        pharmacy_claims: (0..100).map(|i| pharmacy(i, i % 20)).collect(),
        quality_measures: MeasureCategory::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| measure(&format!("Q{i}"), *c))
            .collect(),
    }
}

/// No member carries a risk score, which validation treats as critical.
pub fn unusable_dataset() -> Dataset {
    let mut ds = clean_dataset();
    for m in &mut ds.members {
        m.hcc_risk_score = None;
    }
    ds
}

/// Serves a fixed dataset, failing the first `fail_first` calls.
pub struct FakeSource {
    dataset: Dataset,
    fail_first: u32,
    calls: AtomicU32,
}

impl FakeSource {
    pub fn new(dataset: Dataset) -> Self {
        Self::flaky(dataset, 0)
    }

    pub fn flaky(dataset: Dataset, fail_first: u32) -> Self {
        Self {
            dataset,
            fail_first,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataSource for FakeSource {
    fn fetch<'a>(
        &'a self,
        _contract_id: &'a str,
        _period: Period,
    ) -> BoxFuture<'a, Result<Dataset, OrchestratorError>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                return Err(OrchestratorError::DataSource("connection reset".to_string()));
            }
            Ok(self.dataset.clone())
        })
    }
}

/// Holds each fetch until the test releases it, so control requests can
/// arrive while extraction is in flight.
pub struct GatedSource {
    pub entered: Notify,
    gate: Semaphore,
    dataset: Dataset,
}

impl GatedSource {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            entered: Notify::new(),
            gate: Semaphore::new(0),
            dataset,
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

impl DataSource for GatedSource {
    fn fetch<'a>(
        &'a self,
        _contract_id: &'a str,
        _period: Period,
    ) -> BoxFuture<'a, Result<Dataset, OrchestratorError>> {
        Box::pin(async move {
            self.entered.notify_one();
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| OrchestratorError::DataSource(e.to_string()))?;
            permit.forget();
            Ok(self.dataset.clone())
        })
    }
}

pub struct BrokenRenderer;

impl Renderer for BrokenRenderer {
    fn name(&self) -> &str {
        "broken"
    }

    fn render(&self, _summary: &WorkflowSummary<'_>) -> Result<Artifact, ExportError> {
        Err(ExportError::TemplateRender("disk full".to_string()))
    }
}

pub fn orchestrator(source: Arc<dyn DataSource>, store: Arc<dyn StateStore>) -> Orchestrator {
    Orchestrator::new(source, store)
        .with_contract(ContractParams::new(CONTRACT, 1_000_000.0))
        .with_renderers(vbc_export::default_renderers())
        .with_retry(RetryPolicy::immediate(3))
        .with_as_of(date(2024, 7, 1))
}

pub fn memory_store() -> Arc<MemoryStateStore> {
    Arc::new(MemoryStateStore::new())
}

/// Memory store whose `put` calls with the given 1-based numbers lose the
/// race to another writer. Losing writes are not stored.
pub struct ConflictingStore {
    inner: MemoryStateStore,
    lose: Vec<u32>,
    puts: AtomicU32,
}

impl ConflictingStore {
    pub fn new(lose: impl IntoIterator<Item = u32>) -> Self {
        Self {
            inner: MemoryStateStore::new(),
            lose: lose.into_iter().collect(),
            puts: AtomicU32::new(0),
        }
    }

    pub fn puts(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }
}

impl StateStore for ConflictingStore {
    fn get<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<WorkflowState>, OrchestratorError>> {
        self.inner.get(workflow_id)
    }

    fn put(&self, state: WorkflowState) -> BoxFuture<'_, Result<WorkflowState, OrchestratorError>> {
        let put = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.lose.contains(&put) {
            return Box::pin(async move {
                Err(OrchestratorError::Conflict {
                    workflow_id: state.workflow_id,
                    expected: state.revision,
                    found: state.revision + 1,
                })
            });
        }
        self.inner.put(state)
    }

    fn put_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
        dataset: &'a Dataset,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>> {
        self.inner.put_snapshot(workflow_id, snapshot, dataset)
    }

    fn get_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
    ) -> BoxFuture<'a, Result<Option<Dataset>, OrchestratorError>> {
        self.inner.get_snapshot(workflow_id, snapshot)
    }

    fn put_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        artifact: &'a Artifact,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>> {
        self.inner.put_artifact(workflow_id, artifact)
    }

    fn get_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, OrchestratorError>> {
        self.inner.get_artifact(workflow_id, name)
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<WorkflowState>, OrchestratorError>> {
        self.inner.list()
    }
}
