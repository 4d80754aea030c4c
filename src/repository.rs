use chrono::Utc;
use common::ExchangeRate;
use compute::{ComputeError, EditOutcome, EntityRef};
use model::entities::Dataset;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::events::{EventBus, UpdateEvent, UpdateKind};
use crate::store::DatasetStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Loading or saving failed; nothing was committed or broadcast
    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),

    /// The edit itself was refused before anything was saved
    #[error(transparent)]
    Rejected(#[from] ComputeError),
}

/// Output of an edit that names the entity it touched.
pub trait Mutation {
    fn entity(&self) -> EntityRef;
}

impl Mutation for EditOutcome {
    fn entity(&self) -> EntityRef {
        self.entity.clone()
    }
}

impl<T> Mutation for (EntityRef, T) {
    fn entity(&self) -> EntityRef {
        self.0.clone()
    }
}

/// A committed mutation: the edit's output and the dataset as reloaded after saving.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub output: T,
    pub dataset: Arc<Dataset>,
}

#[derive(Debug)]
struct Snapshot {
    revision: u64,
    dataset: Arc<Dataset>,
}

/// Owner of the dataset.
///
/// Mutations are serialized through a single lane and run
/// load → edit → recalculate → save → reload → publish. Reads never take
/// the lane and see the last committed dataset.
#[derive(Debug)]
pub struct Repository {
    store: Arc<dyn DatasetStore>,
    bus: EventBus,
    rate: ExchangeRate,
    lane: Mutex<()>,
    snapshot: RwLock<Snapshot>,
}

impl Repository {
    /// Loads the stored dataset (or a fresh empty one) and recalculates it.
    #[instrument(skip(store, bus), fields(backend = %store.describe()))]
    pub async fn open(
        store: Arc<dyn DatasetStore>,
        bus: EventBus,
        rate: ExchangeRate,
    ) -> Result<Self, RepositoryError> {
        let dataset = Self::load_from(store.as_ref(), rate).await?;
        info!(
            students = dataset.total_students(),
            expenses = dataset.expenses.len(),
            "Dataset loaded"
        );

        Ok(Self {
            store,
            bus,
            rate,
            lane: Mutex::new(()),
            snapshot: RwLock::new(Snapshot {
                revision: 0,
                dataset: Arc::new(dataset),
            }),
        })
    }

    async fn load_from(store: &dyn DatasetStore, rate: ExchangeRate) -> Result<Dataset, RepositoryError> {
        let mut dataset = match store.load().await.map_err(RepositoryError::Storage)? {
            Some(dataset) => dataset,
            None => {
                debug!("Store is empty, starting from an empty dataset");
                Dataset::empty(rate.ugx_per_euro())
            }
        };
        compute::recalculate(&mut dataset, rate);
        Ok(dataset)
    }

    pub fn rate(&self) -> ExchangeRate {
        self.rate
    }

    pub fn describe_store(&self) -> String {
        self.store.describe()
    }

    /// The last committed dataset.
    pub async fn snapshot(&self) -> Arc<Dataset> {
        self.snapshot.read().await.dataset.clone()
    }

    /// The last committed dataset with a counter that changes on every commit.
    pub async fn versioned_snapshot(&self) -> (u64, Arc<Dataset>) {
        let snapshot = self.snapshot.read().await;
        (snapshot.revision, snapshot.dataset.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.bus.subscribe()
    }

    /// Runs `edit` inside the mutation lane and commits it.
    ///
    /// Nothing is saved or published when the edit is rejected or the store
    /// fails.
    #[instrument(skip(self, edit))]
    pub async fn mutate<T, F>(&self, kind: UpdateKind, edit: F) -> Result<Committed<T>, RepositoryError>
    where
        T: Mutation,
        F: FnOnce(&mut Dataset, ExchangeRate) -> compute::Result<T>,
    {
        let _lane = self.lane.lock().await;
        trace!("Acquired mutation lane");

        let mut dataset = Self::load_from(self.store.as_ref(), self.rate).await?;
        let output = match compute::apply_and_recalculate(&mut dataset, self.rate, edit) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Edit rejected");
                return Err(e.into());
            }
        };
        dataset.metadata.last_updated = Some(Utc::now());

        if let Err(e) = self.store.save(&dataset).await {
            error!(error = %e, "Failed to save dataset, mutation discarded");
            return Err(RepositoryError::Storage(e));
        }
        let reloaded = Arc::new(Self::load_from(self.store.as_ref(), self.rate).await?);

        {
            let mut snapshot = self.snapshot.write().await;
            snapshot.revision += 1;
            snapshot.dataset = reloaded.clone();
        }

        let entity = output.entity();
        debug!(?entity, "Mutation committed");
        self.bus.publish(UpdateEvent {
            kind,
            entity,
            dataset: reloaded.clone(),
        });

        Ok(Committed {
            output,
            dataset: reloaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use compute::edits::{self, NewSponsor, NewStudent};
    use model::ModelError;
    use model::entities::ProgramCode;
    use model::numeric::FinancialInput;

    async fn repository(store: MemoryStore) -> Repository {
        Repository::open(Arc::new(store), EventBus::new(), ExchangeRate::default())
            .await
            .unwrap()
    }

    fn student(name: &str) -> NewStudent {
        NewStudent {
            full_name: name.to_string(),
            financial_data: FinancialInput::new().with("food", 41000.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_open_empty_store() {
        let repo = repository(MemoryStore::new()).await;
        let snapshot = repo.snapshot().await;

        assert_eq!(snapshot.programs.len(), ProgramCode::ALL.len());
        assert_eq!(snapshot.metadata.exchange_rate, 4100.0);
        assert_eq!(repo.describe_store(), "memory");
    }

    #[tokio::test]
    async fn test_mutation_saves_and_publishes() {
        let store = MemoryStore::new();
        let repo = repository(store.clone()).await;
        let mut updates = repo.subscribe();

        let committed = repo
            .mutate(UpdateKind::StudentAdded, |d, rate| {
                edits::add_student(d, ProgramCode::Ch, student("Amina"), rate)
            })
            .await
            .unwrap();

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.program(ProgramCode::Ch).unwrap().students.len(), 1);
        assert!(saved.metadata.last_updated.is_some());
        assert_eq!(committed.dataset.program(ProgramCode::Ch).unwrap().metadata.monthly_costs_eur, 10.0);

        let event = updates.recv().await.unwrap();
        assert_eq!(event.kind, UpdateKind::StudentAdded);
        assert_eq!(
            event.entity,
            EntityRef::Student { program: ProgramCode::Ch, serial_number: 1 }
        );
        assert_eq!(repo.versioned_snapshot().await.0, 1);
    }

    #[tokio::test]
    async fn test_rejected_edit_is_not_saved_or_published() {
        let store = MemoryStore::new();
        let repo = repository(store.clone()).await;
        let mut updates = repo.subscribe();

        let result = repo
            .mutate(UpdateKind::SponsorAdded, |d, _| {
                edits::add_sponsor(
                    d,
                    ProgramCode::Ch,
                    NewSponsor {
                        student_name: "Nobody".to_string(),
                        sponsor_name: "S".to_string(),
                        ..Default::default()
                    },
                )
            })
            .await;

        assert!(matches!(
            result,
            Err(RepositoryError::Rejected(ComputeError::Model(ModelError::UnknownStudent { .. })))
        ));
        assert!(store.load().await.unwrap().is_none());
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_published() {
        let store = MemoryStore::new();
        let repo = repository(store.clone()).await;
        let mut updates = repo.subscribe();
        store.set_fail_saves(true);

        let result = repo
            .mutate(UpdateKind::StudentAdded, |d, rate| {
                edits::add_student(d, ProgramCode::Ch, student("Amina"), rate)
            })
            .await;

        assert!(matches!(result, Err(RepositoryError::Storage(_))));
        assert!(updates.try_recv().is_err());
        assert_eq!(repo.snapshot().await.total_students(), 0);
        assert_eq!(repo.versioned_snapshot().await.0, 0);
    }

    #[tokio::test]
    async fn test_concurrent_mutations_do_not_lose_updates() {
        let repo = Arc::new(repository(MemoryStore::new()).await);

        let mut handles = Vec::new();
        for i in 0..10 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.mutate(UpdateKind::StudentAdded, move |d, rate| {
                    edits::add_student(d, ProgramCode::Ysp, student(&format!("Student {}", i)), rate)
                })
                .await
                .map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = repo.snapshot().await;
        let students = &snapshot.program(ProgramCode::Ysp).unwrap().students;
        assert_eq!(students.len(), 10);
        let serials: Vec<u32> = students.iter().map(|s| s.serial_number).collect();
        assert_eq!(serials, (1..=10).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_huge_sponsor_amount_keeps_file_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("d.json")));
        let repo = Repository::open(store.clone(), EventBus::new(), ExchangeRate::default())
            .await
            .unwrap();

        repo.mutate(UpdateKind::StudentAdded, |d, rate| {
            edits::add_student(d, ProgramCode::Ch, student("A"), rate)
        })
        .await
        .unwrap();
        let committed = repo
            .mutate(UpdateKind::SponsorAdded, |d, _| {
                edits::add_sponsor(
                    d,
                    ProgramCode::Ch,
                    NewSponsor {
                        student_name: "A".to_string(),
                        sponsor_name: "Big".to_string(),
                        amount: 1e305,
                        ..Default::default()
                    },
                )
            })
            .await
            .unwrap();
        assert_eq!(committed.dataset.metadata.program_summary.total_monthly_funding_ugx, 0.0);

        repo.mutate(UpdateKind::StudentAdded, |d, rate| {
            edits::add_student(d, ProgramCode::Ch, student("B"), rate)
        })
        .await
        .unwrap();

        let reopened = Repository::open(store, EventBus::new(), ExchangeRate::default())
            .await
            .unwrap();
        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.program(ProgramCode::Ch).unwrap().students.len(), 2);
        assert!(snapshot.registry(ProgramCode::Ch).unwrap().sponsors[0].amount > 1e304);
    }

    #[tokio::test]
    async fn test_open_recalculates_stored_dataset_without_metadata() {
        let dataset: Dataset = serde_json::from_str(
            r#"{"programs": {"CH": {"code": "CH", "name": "Children's Home",
                "students": [{"serial_number": 1, "full_name": "A", "financial_data": {"food": 41000}}]}}}"#,
        )
        .unwrap();
        let repo = repository(MemoryStore::with_dataset(dataset)).await;

        let snapshot = repo.snapshot().await;
        assert_eq!(snapshot.metadata.exchange_rate, 4100.0);
        assert_eq!(snapshot.metadata.program_summary.total_students_across_all_programs, 1);
        assert_eq!(snapshot.program(ProgramCode::Ch).unwrap().metadata.monthly_costs_eur, 10.0);
    }
}
