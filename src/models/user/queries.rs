use chrono::Utc;

use crate::db::{self, ACTIVE_USER_KEY, KeyValueStore, USERS_KEY};
use crate::errors::AppError;
use super::types::{AuthUser, NewUser, UserUpdate};

pub fn find_all(store: &dyn KeyValueStore) -> Result<Vec<AuthUser>, AppError> {
    db::load_list(store, USERS_KEY)
}

pub fn find_by_id(store: &dyn KeyValueStore, id: &str) -> Result<Option<AuthUser>, AppError> {
    Ok(find_all(store)?.into_iter().find(|u| u.id == id))
}

/// Email lookup is case-insensitive.
pub fn find_by_email(store: &dyn KeyValueStore, email: &str) -> Result<Option<AuthUser>, AppError> {
    let email = email.trim();
    Ok(find_all(store)?
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email)))
}

pub fn create(store: &dyn KeyValueStore, new_user: NewUser) -> Result<AuthUser, AppError> {
    let email = new_user.email.trim().to_string();
    let user = db::update_list(store, USERS_KEY, |users: &mut Vec<AuthUser>| {
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
            return Err(AppError::Conflict(format!("A user with email {email} already exists")));
        }
        let user = AuthUser {
            id: db::new_id(),
            full_name: new_user.full_name.trim().to_string(),
            email: email.clone(),
            password_hash: new_user.password_hash,
            role: new_user.role,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.push(user.clone());
        Ok(user)
    })?;
    log::info!("Created user {} with role {}", user.email, user.role);
    Ok(user)
}

pub fn update(store: &dyn KeyValueStore, id: &str, changes: UserUpdate) -> Result<AuthUser, AppError> {
    db::update_list(store, USERS_KEY, |users: &mut Vec<AuthUser>| {
        if let Some(email) = &changes.email {
            if users
                .iter()
                .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email.trim()))
            {
                return Err(AppError::Conflict(format!("A user with email {} already exists", email.trim())));
            }
        }

        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound)?;
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(email) = changes.email {
            user.email = email.trim().to_string();
        }
        // Password only changes when a new one was supplied
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(active) = changes.active {
            user.active = active;
        }
        user.updated_at = Some(Utc::now());
        Ok(user.clone())
    })
}

pub fn delete(store: &dyn KeyValueStore, id: &str) -> Result<(), AppError> {
    db::update_list(store, USERS_KEY, |users: &mut Vec<AuthUser>| {
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    })?;
    log::info!("Deleted user {}", id);
    Ok(())
}

/// Remember the last signed-in user.
pub fn set_active_user(store: &dyn KeyValueStore, id: &str) -> Result<(), AppError> {
    store.set(ACTIVE_USER_KEY, &serde_json::to_string(id)?)
}

pub fn active_user_id(store: &dyn KeyValueStore) -> Result<Option<String>, AppError> {
    match store.get(ACTIVE_USER_KEY)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
