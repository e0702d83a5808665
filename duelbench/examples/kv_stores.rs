//! DuelBench Example: two in-memory user stores
//!
//! Compares an ordered `BTreeMap` store against a `HashMap` store on the same
//! seeded data set: bulk insert, point lookups, score updates, a tag scan and
//! bulk delete.
//!
//! Run with:
//!   cargo run --release --example kv_stores                          # btree vs hash
//!   cargo run --release --example kv_stores -- -n 10                 # 10 iterations
//!   cargo run --release --example kv_stores -- --baseline hash       # swap sides
//!   cargo run --release --example kv_stores -- --format json -o r.json
//!   cargo run --release --example kv_stores -- list                  # registered systems

use duelbench::prelude::*;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

const USERS: usize = 20_000;
const LOOKUPS: usize = USERS / 2;
const TAGS: [&str; 4] = ["admin", "staff", "guest", "bot"];

struct User {
    name: String,
    tag: &'static str,
    score: i64,
}

/// The operations both back-ends implement
trait UserStore: Default {
    fn insert(&mut self, id: u64, user: User) -> Option<User>;
    fn get(&self, id: u64) -> Option<&User>;
    fn get_mut(&mut self, id: u64) -> Option<&mut User>;
    fn remove(&mut self, id: u64) -> Option<User>;
    fn users(&self) -> Box<dyn Iterator<Item = &User> + '_>;
    fn len(&self) -> usize;
}

#[derive(Default)]
struct BTreeStore(BTreeMap<u64, User>);

impl UserStore for BTreeStore {
    fn insert(&mut self, id: u64, user: User) -> Option<User> {
        self.0.insert(id, user)
    }
    fn get(&self, id: u64) -> Option<&User> {
        self.0.get(&id)
    }
    fn get_mut(&mut self, id: u64) -> Option<&mut User> {
        self.0.get_mut(&id)
    }
    fn remove(&mut self, id: u64) -> Option<User> {
        self.0.remove(&id)
    }
    fn users(&self) -> Box<dyn Iterator<Item = &User> + '_> {
        Box::new(self.0.values())
    }
    fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Default)]
struct HashStore(HashMap<u64, User>);

impl UserStore for HashStore {
    fn insert(&mut self, id: u64, user: User) -> Option<User> {
        self.0.insert(id, user)
    }
    fn get(&self, id: u64) -> Option<&User> {
        self.0.get(&id)
    }
    fn get_mut(&mut self, id: u64) -> Option<&mut User> {
        self.0.get_mut(&id)
    }
    fn remove(&mut self, id: u64) -> Option<User> {
        self.0.remove(&id)
    }
    fn users(&self) -> Box<dyn Iterator<Item = &User> + '_> {
        Box::new(self.0.values())
    }
    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Seeded input shared by every iteration
struct Dataset {
    users: Vec<(u64, String, &'static str)>,
    lookups: Vec<u64>,
}

impl Dataset {
    fn generate(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut ids: Vec<u64> = (0..USERS as u64).collect();
        ids.shuffle(&mut rng);

        let users = ids
            .iter()
            .map(|&id| {
                let name: String = (&mut rng)
                    .sample_iter(&Alphanumeric)
                    .take(12)
                    .map(char::from)
                    .collect();
                let tag = TAGS[rng.gen_range(0..TAGS.len())];
                (id, name, tag)
            })
            .collect();

        let lookups = ids.choose_multiple(&mut rng, LOOKUPS).copied().collect();

        Self { users, lookups }
    }
}

struct StoreWorkload<S> {
    store: S,
    data: Dataset,
}

impl<S: UserStore> Workload for StoreWorkload<S> {
    fn settle(&mut self) {
        self.store = S::default();
    }

    fn run(&mut self, rec: &mut Recorder) -> Result<(), WorkloadError> {
        let store = &mut self.store;
        let data = &self.data;

        rec.measure("Users", "Insert", || {
            for (id, name, tag) in &data.users {
                store.insert(
                    *id,
                    User {
                        name: name.clone(),
                        tag: *tag,
                        score: 0,
                    },
                );
            }
        })?;

        rec.record("Users", "Point lookup", || {
            let hits = data
                .lookups
                .iter()
                .filter_map(|&id| store.get(id))
                .filter(|u| !u.name.is_empty())
                .count();
            ensure(hits == data.lookups.len(), || {
                format!("expected {} hits, got {hits}", data.lookups.len())
            })
        })?;

        rec.record("Users", "Update score", || {
            let mut updated = 0usize;
            for &id in &data.lookups {
                if let Some(user) = store.get_mut(id) {
                    user.score += 1;
                    updated += 1;
                }
            }
            ensure(updated > 0, || "no rows updated".to_string())
        })?;

        let per_tag = rec.measure("Tags", "Scan by tag", || {
            let mut counts = [0usize; TAGS.len()];
            for user in store.users() {
                if let Some(i) = TAGS.iter().position(|t| *t == user.tag) {
                    counts[i] += 1;
                }
            }
            counts
        })?;
        ensure(per_tag.iter().sum::<usize>() == USERS, || {
            format!("tag scan saw {} users", per_tag.iter().sum::<usize>())
        })?;

        rec.record("Users", "Delete", || {
            for (id, _, _) in &data.users {
                store.remove(*id);
            }
            ensure(store.len() == 0, || format!("{} users left", store.len()))
        })?;

        Ok(())
    }
}

fn store_workload<S: UserStore + 'static>(
    config: &WorkloadConfig,
) -> Result<Box<dyn Workload>, WorkloadError> {
    Ok(Box::new(StoreWorkload {
        store: S::default(),
        data: Dataset::generate(config.seed),
    }))
}

fn suite() -> Suite {
    Suite::new("kv-stores")
        .system(SystemDef::new("btree", "BTreeMap", store_workload::<BTreeStore>))
        .system(SystemDef::new("hash", "HashMap", store_workload::<HashStore>))
}

fn main() -> anyhow::Result<()> {
    duelbench::run(&suite())
}
