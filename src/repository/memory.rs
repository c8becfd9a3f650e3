use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::{Arc, PoisonError},
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Repository, UnitOfWork};
use crate::{
    error::{AppError, Conflict},
    models::{
        Event, NewEvent, NewProduct, NewStand, ObjectListing, ObjectPair, Participation,
        ParticipationListing, PopularEvent, Product, Stand, User, UserSummary,
    },
};

#[derive(Clone)]
struct StoredUser {
    user: User,
    profile_picture: Option<String>,
}

/// The whole store. Cloned into a working copy for every unit of work.
#[derive(Clone, Default)]
struct Tables {
    users: BTreeMap<String, StoredUser>,
    events: BTreeMap<i32, Event>,
    stands: BTreeMap<i32, Stand>,
    products: BTreeMap<i32, Product>,
    objects: BTreeSet<(i32, i32)>,
    participations: BTreeMap<(String, i32), DateTime<Utc>>,
    event_seq: i32,
    stand_seq: i32,
    product_seq: i32,
}

impl Tables {
    /// The foreign keys of the schema, checked at commit like deferred constraints.
    fn check_integrity(&self) -> Result<(), String> {
        for event in self.events.values() {
            if !self.users.contains_key(&event.mail_address_creator) {
                return Err(format!("event {} references a missing creator", event.id));
            }
        }
        for stand in self.stands.values() {
            if !self.events.contains_key(&stand.id_event) {
                return Err(format!("stand {} references a missing event", stand.id));
            }
        }
        for (id_stand, id_product) in &self.objects {
            if !self.stands.contains_key(id_stand) || !self.products.contains_key(id_product) {
                return Err(format!("object ({}, {}) is orphaned", id_stand, id_product));
            }
        }
        for (mail_address, id_event) in self.participations.keys() {
            if !self.users.contains_key(mail_address) || !self.events.contains_key(id_event) {
                return Err(format!(
                    "participation ({}, {}) is orphaned",
                    mail_address, id_event
                ));
            }
        }
        Ok(())
    }

    fn participation(&self, key: &(String, i32)) -> Option<Participation> {
        self.participations
            .get(key)
            .map(|register_date| Participation {
                mail_address_user: key.0.clone(),
                id_event: key.1,
                register_date: *register_date,
            })
    }

    fn participations_where(&self, keep: impl Fn(&(String, i32)) -> bool) -> Vec<Participation> {
        self.participations
            .keys()
            .filter(|key| keep(*key))
            .filter_map(|key| self.participation(key))
            .collect()
    }

    fn events_where(&self, keep: impl Fn(&Event) -> bool) -> Vec<Event> {
        let mut events: Vec<Event> = self.events.values().filter(|e| keep(*e)).cloned().collect();
        events.sort_by_key(|e| (e.starting_date, e.id));
        events
    }
}

fn same_city(event: &Event, city: Option<&str>) -> bool {
    city.is_none_or(|city| event.city.to_lowercase() == city.to_lowercase())
}

/// MemoryRepository
///
/// An in-process implementation of the `Repository` trait for tests and local
/// experiments. Units of work are serialized through one async mutex and edit
/// a private copy of the tables, which replaces the shared state only on a
/// successful `commit()`; dropping a unit of work discards the copy.
///
/// Failure injection: after `fail_on("delete_stand")` every unit of work
/// opened from then on fails that operation with an internal error, which is
/// how partial cascades are exercised.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
    failures: Arc<std::sync::Mutex<HashSet<String>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, operation: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        let failures = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            failures,
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    failures: HashSet<String>,
}

impl MemoryUnitOfWork {
    fn check(&self, operation: &str) -> Result<(), AppError> {
        if self.failures.contains(operation) {
            return Err(AppError::internal(format!("injected failure: {}", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    // --- Events ---

    async fn event_exists(&mut self, id: i32) -> Result<bool, AppError> {
        self.check("event_exists")?;
        Ok(self.working.events.contains_key(&id))
    }

    async fn get_event(&mut self, id: i32) -> Result<Option<Event>, AppError> {
        self.check("get_event")?;
        Ok(self.working.events.get(&id).cloned())
    }

    async fn get_all_events(&mut self) -> Result<Vec<Event>, AppError> {
        self.check("get_all_events")?;
        Ok(self.working.events.values().cloned().collect())
    }

    async fn get_events_created_by(&mut self, mail_address: &str) -> Result<Vec<Event>, AppError> {
        self.check("get_events_created_by")?;
        Ok(self
            .working
            .events
            .values()
            .filter(|e| e.mail_address_creator == mail_address)
            .cloned()
            .collect())
    }

    async fn search_upcoming_events(
        &mut self,
        now: DateTime<Utc>,
        city: Option<&str>,
    ) -> Result<Vec<Event>, AppError> {
        self.check("search_upcoming_events")?;
        Ok(self.working.events_where(|e| {
            (e.starting_date >= now || e.ending_date >= now) && same_city(e, city)
        }))
    }

    async fn search_events(
        &mut self,
        date: DateTime<Utc>,
        city: Option<&str>,
    ) -> Result<Vec<Event>, AppError> {
        self.check("search_events")?;
        Ok(self.working.events_where(|e| {
            e.starting_date <= date && e.ending_date >= date && same_city(e, city)
        }))
    }

    async fn get_most_popular_events(&mut self, top: i64) -> Result<Vec<PopularEvent>, AppError> {
        self.check("get_most_popular_events")?;
        let mut counts: HashMap<i32, i64> = HashMap::new();
        for (_, id_event) in self.working.participations.keys() {
            *counts.entry(*id_event).or_default() += 1;
        }
        let mut ranking: Vec<PopularEvent> = counts
            .into_iter()
            .map(|(id_event, count)| PopularEvent { id_event, count })
            .collect();
        ranking.sort_by(|a, b| b.count.cmp(&a.count).then(a.id_event.cmp(&b.id_event)));
        ranking.truncate(usize::try_from(top).unwrap_or(0));
        Ok(ranking)
    }

    async fn insert_event(&mut self, event: &NewEvent) -> Result<Event, AppError> {
        self.check("insert_event")?;
        self.working.event_seq += 1;
        let event = event.clone().with_id(self.working.event_seq);
        self.working.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(&mut self, id: i32, event: &NewEvent) -> Result<Option<Event>, AppError> {
        self.check("update_event")?;
        let Some(stored) = self.working.events.get_mut(&id) else {
            return Ok(None);
        };
        *stored = event.clone().with_id(id);
        Ok(Some(stored.clone()))
    }

    async fn delete_event(&mut self, id: i32) -> Result<bool, AppError> {
        self.check("delete_event")?;
        Ok(self.working.events.remove(&id).is_some())
    }

    async fn reassign_events(&mut self, from: &str, to: &str) -> Result<u64, AppError> {
        self.check("reassign_events")?;
        let mut moved = 0;
        for event in self.working.events.values_mut() {
            if event.mail_address_creator == from {
                event.mail_address_creator = to.to_string();
                moved += 1;
            }
        }
        Ok(moved)
    }

    // --- Stands ---

    async fn stand_exists(&mut self, id: i32) -> Result<bool, AppError> {
        self.check("stand_exists")?;
        Ok(self.working.stands.contains_key(&id))
    }

    async fn get_stand(&mut self, id: i32) -> Result<Option<Stand>, AppError> {
        self.check("get_stand")?;
        Ok(self.working.stands.get(&id).cloned())
    }

    async fn get_all_stands(&mut self) -> Result<Vec<Stand>, AppError> {
        self.check("get_all_stands")?;
        Ok(self.working.stands.values().cloned().collect())
    }

    async fn get_stands_for_event(&mut self, id_event: i32) -> Result<Vec<Stand>, AppError> {
        self.check("get_stands_for_event")?;
        Ok(self
            .working
            .stands
            .values()
            .filter(|s| s.id_event == id_event)
            .cloned()
            .collect())
    }

    async fn count_stands_for_event(&mut self, id_event: i32) -> Result<i64, AppError> {
        self.check("count_stands_for_event")?;
        let count = self
            .working
            .stands
            .values()
            .filter(|s| s.id_event == id_event)
            .count();
        Ok(count as i64)
    }

    async fn get_products_for_stand(&mut self, id_stand: i32) -> Result<Vec<Product>, AppError> {
        self.check("get_products_for_stand")?;
        Ok(self
            .working
            .objects
            .iter()
            .filter(|(stand, _)| *stand == id_stand)
            .filter_map(|(_, product)| self.working.products.get(product).cloned())
            .collect())
    }

    async fn insert_stand(&mut self, stand: &NewStand) -> Result<Stand, AppError> {
        self.check("insert_stand")?;
        self.working.stand_seq += 1;
        let stand = Stand {
            id: self.working.stand_seq,
            stand_type: stand.stand_type.clone(),
            manager_name: stand.manager_name.clone(),
            area_size: stand.area_size,
            id_event: stand.id_event,
        };
        self.working.stands.insert(stand.id, stand.clone());
        Ok(stand)
    }

    async fn update_stand(&mut self, id: i32, stand: &NewStand) -> Result<Option<Stand>, AppError> {
        self.check("update_stand")?;
        let Some(stored) = self.working.stands.get_mut(&id) else {
            return Ok(None);
        };
        stored.stand_type = stand.stand_type.clone();
        stored.manager_name = stand.manager_name.clone();
        stored.area_size = stand.area_size;
        stored.id_event = stand.id_event;
        Ok(Some(stored.clone()))
    }

    async fn delete_stand(&mut self, id: i32) -> Result<bool, AppError> {
        self.check("delete_stand")?;
        Ok(self.working.stands.remove(&id).is_some())
    }

    // --- Products ---

    async fn product_exists(&mut self, id: i32) -> Result<bool, AppError> {
        self.check("product_exists")?;
        Ok(self.working.products.contains_key(&id))
    }

    async fn get_product(&mut self, id: i32) -> Result<Option<Product>, AppError> {
        self.check("get_product")?;
        Ok(self.working.products.get(&id).cloned())
    }

    async fn get_all_products(&mut self) -> Result<Vec<Product>, AppError> {
        self.check("get_all_products")?;
        Ok(self.working.products.values().cloned().collect())
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, AppError> {
        self.check("insert_product")?;
        self.working.product_seq += 1;
        let product = Product {
            id: self.working.product_seq,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
        };
        self.working.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &mut self,
        id: i32,
        product: &NewProduct,
    ) -> Result<Option<Product>, AppError> {
        self.check("update_product")?;
        let Some(stored) = self.working.products.get_mut(&id) else {
            return Ok(None);
        };
        stored.name = product.name.clone();
        stored.description = product.description.clone();
        stored.price = product.price;
        Ok(Some(stored.clone()))
    }

    async fn delete_product(&mut self, id: i32) -> Result<bool, AppError> {
        self.check("delete_product")?;
        Ok(self.working.products.remove(&id).is_some())
    }

    // --- Objects ---

    async fn object_exists(&mut self, pair: ObjectPair) -> Result<bool, AppError> {
        self.check("object_exists")?;
        Ok(self
            .working
            .objects
            .contains(&(pair.id_stand, pair.id_product)))
    }

    async fn get_all_objects(&mut self) -> Result<Vec<ObjectListing>, AppError> {
        self.check("get_all_objects")?;
        let tables = &self.working;
        Ok(tables
            .objects
            .iter()
            .filter_map(|(id_stand, id_product)| {
                let stand = tables.stands.get(id_stand)?;
                let product = tables.products.get(id_product)?;
                Some(ObjectListing {
                    type_stand: stand.stand_type.clone(),
                    id_stand: *id_stand,
                    name_product: product.name.clone(),
                    id_product: *id_product,
                })
            })
            .collect())
    }

    async fn insert_object(&mut self, pair: ObjectPair) -> Result<ObjectPair, AppError> {
        self.check("insert_object")?;
        if !self.working.objects.insert((pair.id_stand, pair.id_product)) {
            return Err(AppError::Conflict(Conflict::ObjectExists));
        }
        Ok(pair)
    }

    async fn update_object(
        &mut self,
        current: ObjectPair,
        new: ObjectPair,
    ) -> Result<Option<ObjectPair>, AppError> {
        self.check("update_object")?;
        let current_key = (current.id_stand, current.id_product);
        let new_key = (new.id_stand, new.id_product);
        if !self.working.objects.contains(&current_key) {
            return Ok(None);
        }
        if current_key != new_key && self.working.objects.contains(&new_key) {
            return Err(AppError::Conflict(Conflict::ObjectExists));
        }
        self.working.objects.remove(&current_key);
        self.working.objects.insert(new_key);
        Ok(Some(new))
    }

    async fn delete_object(&mut self, pair: ObjectPair) -> Result<bool, AppError> {
        self.check("delete_object")?;
        Ok(self
            .working
            .objects
            .remove(&(pair.id_stand, pair.id_product)))
    }

    async fn delete_objects_for_stand(&mut self, id_stand: i32) -> Result<u64, AppError> {
        self.check("delete_objects_for_stand")?;
        let before = self.working.objects.len();
        self.working.objects.retain(|(stand, _)| *stand != id_stand);
        Ok((before - self.working.objects.len()) as u64)
    }

    async fn delete_objects_for_product(&mut self, id_product: i32) -> Result<u64, AppError> {
        self.check("delete_objects_for_product")?;
        let before = self.working.objects.len();
        self.working
            .objects
            .retain(|(_, product)| *product != id_product);
        Ok((before - self.working.objects.len()) as u64)
    }

    // --- Participations ---

    async fn participation_exists(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<bool, AppError> {
        self.check("participation_exists")?;
        Ok(self
            .working
            .participations
            .contains_key(&(mail_address.to_string(), id_event)))
    }

    async fn get_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<Option<Participation>, AppError> {
        self.check("get_participation")?;
        Ok(self
            .working
            .participation(&(mail_address.to_string(), id_event)))
    }

    async fn get_all_participations(&mut self) -> Result<Vec<ParticipationListing>, AppError> {
        self.check("get_all_participations")?;
        let tables = &self.working;
        let mut listings: Vec<ParticipationListing> = tables
            .participations
            .iter()
            .filter_map(|((mail_address, id_event), register_date)| {
                let event = tables.events.get(id_event)?;
                Some(ParticipationListing {
                    mail_address_user: mail_address.clone(),
                    id_event: *id_event,
                    name: event.name.clone(),
                    register_date: *register_date,
                })
            })
            .collect();
        listings.sort_by(|a, b| {
            (a.id_event, &a.mail_address_user).cmp(&(b.id_event, &b.mail_address_user))
        });
        Ok(listings)
    }

    async fn get_participations_for_user(
        &mut self,
        mail_address: &str,
    ) -> Result<Vec<Participation>, AppError> {
        self.check("get_participations_for_user")?;
        Ok(self
            .working
            .participations_where(|(mail, _)| mail == mail_address))
    }

    async fn get_participations_for_event(
        &mut self,
        id_event: i32,
    ) -> Result<Vec<Participation>, AppError> {
        self.check("get_participations_for_event")?;
        Ok(self
            .working
            .participations_where(|(_, event)| *event == id_event))
    }

    async fn count_participations_for_event(&mut self, id_event: i32) -> Result<i64, AppError> {
        self.check("count_participations_for_event")?;
        let count = self
            .working
            .participations
            .keys()
            .filter(|(_, event)| *event == id_event)
            .count();
        Ok(count as i64)
    }

    async fn get_participations_for_user_between(
        &mut self,
        mail_address: &str,
        starting: DateTime<Utc>,
        ending: DateTime<Utc>,
    ) -> Result<Vec<Participation>, AppError> {
        self.check("get_participations_for_user_between")?;
        let events = &self.working.events;
        Ok(self.working.participations_where(|(mail, id_event)| {
            mail == mail_address
                && events
                    .get(id_event)
                    .is_some_and(|e| e.starting_date <= ending && e.ending_date >= starting)
        }))
    }

    async fn insert_participation(
        &mut self,
        participation: &Participation,
    ) -> Result<Participation, AppError> {
        self.check("insert_participation")?;
        let key = (
            participation.mail_address_user.clone(),
            participation.id_event,
        );
        if self.working.participations.contains_key(&key) {
            return Err(AppError::Conflict(Conflict::ParticipationExists));
        }
        self.working
            .participations
            .insert(key, participation.register_date);
        Ok(participation.clone())
    }

    async fn update_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
        participation: &Participation,
    ) -> Result<Option<Participation>, AppError> {
        self.check("update_participation")?;
        let current_key = (mail_address.to_string(), id_event);
        let new_key = (
            participation.mail_address_user.clone(),
            participation.id_event,
        );
        if !self.working.participations.contains_key(&current_key) {
            return Ok(None);
        }
        if current_key != new_key && self.working.participations.contains_key(&new_key) {
            return Err(AppError::Conflict(Conflict::ParticipationExists));
        }
        self.working.participations.remove(&current_key);
        self.working
            .participations
            .insert(new_key, participation.register_date);
        Ok(Some(participation.clone()))
    }

    async fn delete_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<bool, AppError> {
        self.check("delete_participation")?;
        Ok(self
            .working
            .participations
            .remove(&(mail_address.to_string(), id_event))
            .is_some())
    }

    async fn delete_participations_for_user(
        &mut self,
        mail_address: &str,
    ) -> Result<u64, AppError> {
        self.check("delete_participations_for_user")?;
        let before = self.working.participations.len();
        self.working
            .participations
            .retain(|(mail, _), _| mail != mail_address);
        Ok((before - self.working.participations.len()) as u64)
    }

    async fn delete_participations_for_event(&mut self, id_event: i32) -> Result<u64, AppError> {
        self.check("delete_participations_for_event")?;
        let before = self.working.participations.len();
        self.working
            .participations
            .retain(|(_, event), _| *event != id_event);
        Ok((before - self.working.participations.len()) as u64)
    }

    async fn rename_participations(&mut self, from: &str, to: &str) -> Result<u64, AppError> {
        self.check("rename_participations")?;
        let moved: Vec<(i32, DateTime<Utc>)> = self
            .working
            .participations
            .iter()
            .filter(|((mail, _), _)| mail == from)
            .map(|((_, id_event), register_date)| (*id_event, *register_date))
            .collect();
        for (id_event, _) in &moved {
            if self
                .working
                .participations
                .contains_key(&(to.to_string(), *id_event))
            {
                return Err(AppError::Conflict(Conflict::ParticipationExists));
            }
        }
        for (id_event, register_date) in &moved {
            self.working
                .participations
                .remove(&(from.to_string(), *id_event));
            self.working
                .participations
                .insert((to.to_string(), *id_event), *register_date);
        }
        Ok(moved.len() as u64)
    }

    // --- Users ---

    async fn user_exists(&mut self, mail_address: &str) -> Result<bool, AppError> {
        self.check("user_exists")?;
        Ok(self.working.users.contains_key(mail_address))
    }

    async fn get_user(&mut self, mail_address: &str) -> Result<Option<User>, AppError> {
        self.check("get_user")?;
        Ok(self
            .working
            .users
            .get(mail_address)
            .map(|stored| stored.user.clone()))
    }

    async fn get_all_users(&mut self) -> Result<Vec<UserSummary>, AppError> {
        self.check("get_all_users")?;
        Ok(self
            .working
            .users
            .values()
            .map(|stored| UserSummary::from(stored.user.clone()))
            .collect())
    }

    async fn insert_user(&mut self, user: &User) -> Result<User, AppError> {
        self.check("insert_user")?;
        if self.working.users.contains_key(&user.mail_address) {
            return Err(AppError::Conflict(Conflict::AlreadyRegistered));
        }
        self.working.users.insert(
            user.mail_address.clone(),
            StoredUser {
                user: user.clone(),
                profile_picture: None,
            },
        );
        Ok(user.clone())
    }

    async fn update_user(
        &mut self,
        mail_address: &str,
        user: &User,
    ) -> Result<Option<User>, AppError> {
        self.check("update_user")?;
        if user.mail_address != mail_address && self.working.users.contains_key(&user.mail_address)
        {
            return Err(AppError::Conflict(Conflict::AlreadyRegistered));
        }
        let Some(stored) = self.working.users.remove(mail_address) else {
            return Ok(None);
        };
        self.working.users.insert(
            user.mail_address.clone(),
            StoredUser {
                user: user.clone(),
                profile_picture: stored.profile_picture,
            },
        );
        Ok(Some(user.clone()))
    }

    async fn update_profile_picture(
        &mut self,
        mail_address: &str,
        picture: &str,
    ) -> Result<bool, AppError> {
        self.check("update_profile_picture")?;
        let Some(stored) = self.working.users.get_mut(mail_address) else {
            return Ok(false);
        };
        stored.profile_picture = Some(picture.to_string());
        Ok(true)
    }

    async fn get_profile_picture(
        &mut self,
        mail_address: &str,
    ) -> Result<Option<String>, AppError> {
        self.check("get_profile_picture")?;
        Ok(self
            .working
            .users
            .get(mail_address)
            .and_then(|stored| stored.profile_picture.clone()))
    }

    async fn delete_user(&mut self, mail_address: &str) -> Result<bool, AppError> {
        self.check("delete_user")?;
        Ok(self.working.users.remove(mail_address).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.check("commit")?;
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        working
            .check_integrity()
            .map_err(|violation| AppError::internal(format!("foreign key violation: {}", violation)))?;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::NaiveDate;

    fn user(mail_address: &str) -> User {
        User {
            mail_address: mail_address.to_string(),
            password: "hash".to_string(),
            name: "Test".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 5, 4).unwrap(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn uncommitted_work_is_discarded() {
        let repo = MemoryRepository::new();
        {
            let mut uow = repo.begin().await.unwrap();
            uow.insert_user(&user("a@test.be")).await.unwrap();
        }
        let mut uow = repo.begin().await.unwrap();
        assert!(!uow.user_exists("a@test.be").await.unwrap());
    }

    #[tokio::test]
    async fn committed_work_is_visible() {
        let repo = MemoryRepository::new();
        let mut uow = repo.begin().await.unwrap();
        uow.insert_user(&user("a@test.be")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = repo.begin().await.unwrap();
        assert!(uow.user_exists("a@test.be").await.unwrap());
        assert!(matches!(
            uow.insert_user(&user("a@test.be")).await,
            Err(AppError::Conflict(Conflict::AlreadyRegistered))
        ));
    }

    #[tokio::test]
    async fn orphaned_rows_are_refused_at_commit() {
        let repo = MemoryRepository::new();
        let mut uow = repo.begin().await.unwrap();
        uow.insert_participation(&Participation {
            mail_address_user: "ghost@test.be".to_string(),
            id_event: 42,
            register_date: Utc::now(),
        })
        .await
        .unwrap();
        assert!(matches!(uow.commit().await, Err(AppError::Internal(_))));

        let mut uow = repo.begin().await.unwrap();
        assert!(
            uow.get_participations_for_user("ghost@test.be")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn injected_failures_hit_the_named_operation_only() {
        let repo = MemoryRepository::new();
        repo.fail_on("user_exists");
        let mut uow = repo.begin().await.unwrap();
        assert!(uow.user_exists("a@test.be").await.is_err());
        assert!(uow.get_user("a@test.be").await.unwrap().is_none());
        drop(uow);

        repo.clear_failures();
        let mut uow = repo.begin().await.unwrap();
        assert!(!uow.user_exists("a@test.be").await.unwrap());
    }
}
