//! In-memory pet registry backing the bundled petstore document.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query};
use axum::response::IntoResponse;
use http::StatusCode;
use oasbridge::{ApiError, RegistryResolver};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewPet {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default)]
struct PetStore {
    pets: RwLock<BTreeMap<u64, Pet>>,
}

impl PetStore {
    fn list(&self, limit: Option<usize>) -> Vec<Pet> {
        let pets = self.pets.read();
        pets.values().take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    fn insert(&self, new_pet: NewPet) -> Pet {
        let mut pets = self.pets.write();
        let id = pets.keys().next_back().map_or(1, |last| last + 1);
        let pet = Pet {
            id,
            name: new_pet.name,
            tag: new_pet.tag,
        };
        pets.insert(id, pet.clone());
        pet
    }

    fn get(&self, id: u64) -> Option<Pet> {
        self.pets.read().get(&id).cloned()
    }

    fn remove(&self, id: u64) -> bool {
        self.pets.write().remove(&id).is_some()
    }
}

/// Resolver binding every operation of the petstore document to the shared
/// in-memory store.
pub fn petstore_resolver() -> Arc<RegistryResolver> {
    let store = Arc::new(PetStore::default());

    let list_store = Arc::clone(&store);
    let create_store = Arc::clone(&store);
    let get_store = Arc::clone(&store);
    let delete_store = store;

    Arc::new(
        RegistryResolver::new()
            .route("listPets", move |Query(query): Query<ListQuery>| {
                let store = Arc::clone(&list_store);
                async move { Json(store.list(query.limit)) }
            })
            .route("createPet", move |Json(new_pet): Json<NewPet>| {
                let store = Arc::clone(&create_store);
                async move { (StatusCode::CREATED, Json(store.insert(new_pet))) }
            })
            .route("getPet", move |Path(pet_id): Path<u64>| {
                let store = Arc::clone(&get_store);
                async move {
                    match store.get(pet_id) {
                        Some(pet) => Json(pet).into_response(),
                        None => missing_pet(pet_id).into_response(),
                    }
                }
            })
            .route("deletePet", move |Path(pet_id): Path<u64>| {
                let store = Arc::clone(&delete_store);
                async move {
                    if store.remove(pet_id) {
                        StatusCode::NO_CONTENT.into_response()
                    } else {
                        missing_pet(pet_id).into_response()
                    }
                }
            }),
    )
}

fn missing_pet(pet_id: u64) -> ApiError {
    ApiError::not_found(format!("pet {pet_id} does not exist"))
}
