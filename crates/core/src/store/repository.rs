use std::sync::{mpsc, Arc};

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    cost::CostEngine,
    error::{RecordKind, SquadError, SquadResult},
    events::{EventBus, SquadEvent, Subscription},
    models::Faction,
    squad::{EquippedUpgrade, HyperspaceChange, HyperspacePolicy, Member, Squad, UpgradeHandle},
};

use super::SquadStorage;

/// Ordered squad collection backed by a [`SquadStorage`].
///
/// Cloning is cheap and every clone shares the same list. Mutations hold a
/// write lock while the list is changed and saved, so concurrent writers
/// are serialised; observers run after the lock is released but before the
/// mutating call returns. A failed save rolls the in-memory list back.
#[derive(Clone)]
pub struct SquadRepository {
    inner: Arc<RwLock<Inner>>,
    storage: Arc<dyn SquadStorage>,
    catalog: Arc<Catalog>,
    events: Arc<EventBus>,
    policy: HyperspacePolicy,
}

struct Inner {
    squads: Vec<Squad>,
}

impl SquadRepository {
    /// Load the stored list.
    ///
    /// Squads that no longer validate against the catalog are kept and
    /// logged rather than dropped.
    pub fn open(storage: Arc<dyn SquadStorage>, catalog: Arc<Catalog>) -> SquadResult<Self> {
        let squads = storage.load()?;
        for squad in &squads {
            if let Err(err) = squad.validate(&catalog) {
                warn!(squad = %squad.id(), name = %squad.name(), %err, "Stored squad does not validate");
            }
        }
        info!(squads = squads.len(), "Squad repository opened");
        Ok(Self::with_squads(storage, catalog, squads))
    }

    /// Start with an empty list, ignoring whatever is stored.
    pub fn empty(storage: Arc<dyn SquadStorage>, catalog: Arc<Catalog>) -> Self {
        Self::with_squads(storage, catalog, Vec::new())
    }

    fn with_squads(
        storage: Arc<dyn SquadStorage>,
        catalog: Arc<Catalog>,
        squads: Vec<Squad>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { squads })),
            storage,
            catalog,
            events: Arc::new(EventBus::new()),
            policy: HyperspacePolicy::default(),
        }
    }

    /// Choose how enabling hyperspace-only treats illegal content.
    pub fn with_hyperspace_policy(mut self, policy: HyperspacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active hyperspace policy.
    pub fn hyperspace_policy(&self) -> HyperspacePolicy {
        self.policy
    }

    /// Catalog the squads are validated and costed against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Register a change observer.
    pub fn subscribe(
        &self,
        callback: impl Fn(&SquadEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.events.subscribe(callback)
    }

    /// Remove a change observer.
    pub fn unsubscribe(&self, token: Subscription) -> bool {
        self.events.unsubscribe(token)
    }

    /// Receive change events through a channel.
    pub fn subscribe_channel(&self) -> mpsc::Receiver<SquadEvent> {
        self.events.subscribe_channel()
    }

    /// Snapshot of all squads in order.
    pub fn all(&self) -> Vec<Squad> {
        self.inner.read().squads.clone()
    }

    /// Copy of one squad.
    pub fn get(&self, id: Uuid) -> Option<Squad> {
        self.inner
            .read()
            .squads
            .iter()
            .find(|squad| squad.id() == id)
            .cloned()
    }

    /// Number of stored squads.
    pub fn len(&self) -> usize {
        self.inner.read().squads.len()
    }

    /// True when no squads are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total point cost of a stored squad.
    pub fn squad_cost(&self, id: Uuid) -> SquadResult<i32> {
        let inner = self.inner.read();
        let squad = inner
            .squads
            .iter()
            .find(|squad| squad.id() == id)
            .ok_or_else(|| SquadError::not_found(RecordKind::Squad, id))?;
        CostEngine::new(&self.catalog).squad_cost(squad)
    }

    /// Write the whole list to storage.
    pub fn save(&self) -> SquadResult<()> {
        let inner = self.inner.read();
        self.storage.save(&inner.squads)?;
        Ok(())
    }

    /// Append a squad, persist and notify.
    pub fn add(&self, squad: Squad) -> SquadResult<()> {
        squad.validate(&self.catalog)?;
        let id = squad.id();
        {
            let mut inner = self.inner.write();
            if inner.squads.iter().any(|existing| existing.id() == id) {
                return Err(SquadError::IllegalState(format!(
                    "squad {id} is already stored"
                )));
            }
            inner.squads.push(squad);
            if let Err(err) = self.storage.save(&inner.squads) {
                inner.squads.pop();
                return Err(err.into());
            }
        }
        info!(squad = %id, "Squad added");
        self.events.publish(&SquadEvent::SquadListChanged);
        Ok(())
    }

    /// Create, store and return an empty squad.
    pub fn create(&self, faction: Faction, name: impl Into<String>) -> SquadResult<Squad> {
        let squad = Squad::new(faction, name);
        self.add(squad.clone())?;
        Ok(squad)
    }

    /// Remove a squad by id. Unknown ids are ignored and reported as `false`.
    pub fn delete(&self, id: Uuid) -> SquadResult<bool> {
        {
            let mut inner = self.inner.write();
            let Some(index) = inner.squads.iter().position(|squad| squad.id() == id) else {
                debug!(squad = %id, "Delete ignored; squad not stored");
                return Ok(false);
            };
            let removed = inner.squads.remove(index);
            if let Err(err) = self.storage.save(&inner.squads) {
                inner.squads.insert(index, removed);
                return Err(err.into());
            }
        }
        info!(squad = %id, "Squad deleted");
        self.events.publish(&SquadEvent::SquadListChanged);
        Ok(true)
    }

    /// Store a deep copy of a squad and return it.
    pub fn duplicate(&self, id: Uuid) -> SquadResult<Squad> {
        let original = self
            .get(id)
            .ok_or_else(|| SquadError::not_found(RecordKind::Squad, id))?;
        let copy = original.duplicate();
        self.add(copy.clone())?;
        info!(from = %id, to = %copy.id(), "Squad duplicated");
        Ok(copy)
    }

    /// Run a squad operation against a stored squad.
    ///
    /// The operation works on a copy; the stored squad is only replaced, saved
    /// and announced when it succeeds and actually changed something.
    pub fn update<T>(
        &self,
        id: Uuid,
        op: impl FnOnce(&mut Squad, &Catalog) -> SquadResult<T>,
    ) -> SquadResult<T> {
        let (result, events) = {
            let mut inner = self.inner.write();
            let index = inner
                .squads
                .iter()
                .position(|squad| squad.id() == id)
                .ok_or_else(|| SquadError::not_found(RecordKind::Squad, id))?;

            let previous = inner.squads[index].clone();
            let mut working = previous.clone();
            let result = op(&mut working, &self.catalog)?;
            if working == previous {
                return Ok(result);
            }

            inner.squads[index] = working;
            if let Err(err) = self.storage.save(&inner.squads) {
                inner.squads[index] = previous;
                return Err(err.into());
            }
            let events = change_events(&self.catalog, &previous, &inner.squads[index]);
            (result, events)
        };

        debug!(squad = %id, events = events.len(), "Squad updated");
        for event in &events {
            self.events.publish(event);
        }
        Ok(result)
    }

    /// Add a member to a stored squad.
    pub fn add_member(&self, squad: Uuid, ship_id: &str, pilot_id: &str) -> SquadResult<Member> {
        self.update(squad, |squad, catalog| {
            squad.add_member(catalog, ship_id, pilot_id)
        })
    }

    /// Remove a member from a stored squad.
    pub fn remove_member(&self, squad: Uuid, member: Uuid) -> SquadResult<Member> {
        self.update(squad, |squad, _| squad.remove_member(member))
    }

    /// Equip an upgrade on a member of a stored squad.
    pub fn add_upgrade(
        &self,
        squad: Uuid,
        member: Uuid,
        upgrade_id: &str,
    ) -> SquadResult<UpgradeHandle> {
        self.update(squad, |squad, catalog| {
            squad.add_upgrade(catalog, member, upgrade_id)
        })
    }

    /// Unequip an upgrade from a member of a stored squad.
    pub fn remove_upgrade(
        &self,
        squad: Uuid,
        member: Uuid,
        handle: UpgradeHandle,
    ) -> SquadResult<Vec<EquippedUpgrade>> {
        self.update(squad, |squad, catalog| {
            squad.remove_upgrade(catalog, member, handle)
        })
    }

    /// Toggle hyperspace-only using the repository's policy.
    pub fn set_hyperspace_only(&self, squad: Uuid, enabled: bool) -> SquadResult<HyperspaceChange> {
        let policy = self.policy;
        self.update(squad, |squad, catalog| {
            squad.set_hyperspace_only(catalog, enabled, policy)
        })
    }

    /// Rename a stored squad.
    pub fn rename(&self, squad: Uuid, name: &str, description: &str) -> SquadResult<()> {
        self.update(squad, |squad, _| {
            squad.rename(name, description);
            Ok(())
        })
    }
}

fn change_events(catalog: &Catalog, before: &Squad, after: &Squad) -> Vec<SquadEvent> {
    let squad = after.id();
    let mut events = vec![SquadEvent::SquadUpdated { squad }];

    events.extend(
        before
            .members()
            .iter()
            .filter(|member| after.member(member.id()).is_none())
            .map(|member| SquadEvent::MemberRemoved {
                squad,
                member: member.id(),
            }),
    );
    events.extend(
        after
            .members()
            .iter()
            .filter(|member| before.member(member.id()).is_none())
            .map(|member| SquadEvent::MemberAdded {
                squad,
                member: member.id(),
            }),
    );

    let engine = CostEngine::new(catalog);
    if let (Ok(previous), Ok(current)) = (engine.squad_cost(before), engine.squad_cost(after)) {
        if previous != current {
            events.push(SquadEvent::CostChanged {
                squad,
                previous,
                current,
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::PersistenceError,
        store::MemoryStorage,
        test_support::sample_catalog,
    };
    use parking_lot::Mutex;
    use std::{io, path::PathBuf};

    struct FailingStorage;

    impl SquadStorage for FailingStorage {
        fn load(&self) -> Result<Vec<Squad>, PersistenceError> {
            Ok(Vec::new())
        }

        fn save(&self, _squads: &[Squad]) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io {
                path: PathBuf::from("/read-only/squads.json"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn repository() -> (SquadRepository, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::default());
        let repo = SquadRepository::open(storage.clone(), Arc::new(sample_catalog())).unwrap();
        (repo, storage)
    }

    #[test]
    fn add_persists_and_observers_see_new_state() {
        let (repo, storage) = repository();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let reader = repo.clone();
        repo.subscribe(move |event| {
            sink.lock().push((event.clone(), reader.len()));
        });

        let squad = repo.create(Faction::RebelAlliance, "Aces").unwrap();
        assert_eq!(storage.snapshot(), vec![squad.clone()]);
        assert_eq!(
            observed.lock().as_slice(),
            &[(SquadEvent::SquadListChanged, 1)]
        );
        assert!(matches!(
            repo.add(squad),
            Err(SquadError::IllegalState(_))
        ));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn delete_of_unknown_squad_is_a_no_op() {
        let (repo, storage) = repository();
        let squad = repo.create(Faction::GalacticEmpire, "Swarm").unwrap();
        let events = repo.subscribe_channel();

        assert!(!repo.delete(Uuid::new_v4()).unwrap());
        assert!(events.try_recv().is_err());
        assert_eq!(repo.len(), 1);

        assert!(repo.delete(squad.id()).unwrap());
        assert_eq!(events.try_recv(), Ok(SquadEvent::SquadListChanged));
        assert!(repo.is_empty());
        assert!(storage.snapshot().is_empty());
    }

    #[test]
    fn update_emits_member_and_cost_events() {
        let (repo, storage) = repository();
        let squad = repo.create(Faction::RebelAlliance, "Aces").unwrap();
        let events = repo.subscribe_channel();

        let member = repo
            .add_member(squad.id(), "rz1awing", "greensquadronpilot")
            .unwrap();
        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                SquadEvent::SquadUpdated { squad: squad.id() },
                SquadEvent::MemberAdded {
                    squad: squad.id(),
                    member: member.id(),
                },
                SquadEvent::CostChanged {
                    squad: squad.id(),
                    previous: 0,
                    current: 20,
                },
            ]
        );

        repo.add_upgrade(squad.id(), member.id(), "clustermissiles")
            .unwrap();
        assert_eq!(repo.squad_cost(squad.id()).unwrap(), 24);
        assert_eq!(storage.snapshot()[0].members()[0].upgrades().len(), 1);

        repo.remove_member(squad.id(), member.id()).unwrap();
        let received: Vec<_> = events.try_iter().collect();
        assert!(received.contains(&SquadEvent::MemberRemoved {
            squad: squad.id(),
            member: member.id(),
        }));
        assert!(received.contains(&SquadEvent::CostChanged {
            squad: squad.id(),
            previous: 24,
            current: 0,
        }));
    }

    #[test]
    fn rejected_operation_changes_nothing() {
        let (repo, storage) = repository();
        let squad = repo.create(Faction::RebelAlliance, "Aces").unwrap();
        let events = repo.subscribe_channel();

        let result = repo.add_member(squad.id(), "tielnfighter", "academypilot");
        assert!(matches!(result, Err(SquadError::FactionMismatch { .. })));
        assert!(events.try_recv().is_err());
        assert_eq!(repo.get(squad.id()), Some(squad.clone()));
        assert_eq!(storage.snapshot(), vec![squad.clone()]);

        assert!(matches!(
            repo.add_member(Uuid::new_v4(), "t65xwing", "lukeskywalker"),
            Err(SquadError::NotFound {
                kind: RecordKind::Squad,
                ..
            })
        ));
    }

    #[test]
    fn unchanged_squad_is_not_saved_again() {
        let (repo, _) = repository();
        let squad = repo.create(Faction::RebelAlliance, "Aces").unwrap();
        let events = repo.subscribe_channel();

        let change = repo.set_hyperspace_only(squad.id(), false).unwrap();
        assert!(change.is_empty());
        assert!(events.try_recv().is_err());

        repo.rename(squad.id(), "Aces High", "Luke leads").unwrap();
        assert_eq!(
            events.try_recv(),
            Ok(SquadEvent::SquadUpdated { squad: squad.id() })
        );
        assert_eq!(repo.get(squad.id()).unwrap().name(), "Aces High");
    }

    #[test]
    fn failed_save_rolls_back_and_surfaces_error() {
        let repo = SquadRepository::open(Arc::new(FailingStorage), Arc::new(sample_catalog()))
            .unwrap();
        let events = repo.subscribe_channel();

        let result = repo.create(Faction::RebelAlliance, "Aces");
        assert!(matches!(
            result,
            Err(SquadError::Persistence(PersistenceError::Io { .. }))
        ));
        assert!(repo.is_empty());
        assert!(events.try_recv().is_err());
        assert!(matches!(repo.save(), Err(SquadError::Persistence(_))));
    }

    #[test]
    fn duplicate_stores_an_independent_copy() {
        let (repo, _) = repository();
        let squad = repo.create(Faction::RebelAlliance, "Aces").unwrap();
        let luke = repo
            .add_member(squad.id(), "t65xwing", "lukeskywalker")
            .unwrap();
        repo.add_upgrade(squad.id(), luke.id(), "protontorpedoes")
            .unwrap();

        let copy = repo.duplicate(squad.id()).unwrap();
        let ids: Vec<_> = repo.all().iter().map(Squad::id).collect();
        assert_eq!(ids, vec![squad.id(), copy.id()]);
        assert_eq!(
            repo.squad_cost(copy.id()).unwrap(),
            repo.squad_cost(squad.id()).unwrap()
        );

        let copied_luke = copy.members()[0].id();
        assert_ne!(copied_luke, luke.id());
        repo.remove_member(copy.id(), copied_luke).unwrap();
        assert_eq!(repo.get(squad.id()).unwrap().members().len(), 1);
    }

    #[test]
    fn strip_policy_applies_through_repository() {
        let storage = Arc::new(MemoryStorage::default());
        let repo = SquadRepository::open(storage, Arc::new(sample_catalog()))
            .unwrap()
            .with_hyperspace_policy(HyperspacePolicy::Strip);
        let squad = repo.create(Faction::RebelAlliance, "Aces").unwrap();
        repo.add_member(squad.id(), "t65xwing", "bluesquadronescort")
            .unwrap();

        let change = repo.set_hyperspace_only(squad.id(), true).unwrap();
        assert_eq!(change.removed_members.len(), 1);
        let stored = repo.get(squad.id()).unwrap();
        assert!(stored.is_hyperspace_only());
        assert!(stored.members().is_empty());
    }

    #[test]
    fn open_keeps_stale_squads() {
        let stale: Squad = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "faction": "rebelalliance",
            "members": [{ "id": Uuid::new_v4(), "shipID": "t65xwing", "pilotID": "wedgeantilles" }]
        }))
        .unwrap();
        let storage = Arc::new(MemoryStorage::with_squads(vec![stale.clone()]));
        let repo = SquadRepository::open(storage, Arc::new(sample_catalog())).unwrap();
        assert_eq!(repo.all(), vec![stale.clone()]);
        assert!(matches!(
            repo.squad_cost(stale.id()),
            Err(SquadError::NotFound {
                kind: RecordKind::Pilot,
                ..
            })
        ));
    }
}
