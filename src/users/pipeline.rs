//! Pre-save pipeline for user records.
//!
//! A [`Draft`] is the record being saved plus the transient password fields
//! that never reach storage. [`run`] pushes it through a fixed list of steps;
//! the first step that fails stops the save and nothing is persisted.

use time::OffsetDateTime;
use tracing::trace;
use uuid::Uuid;

use super::{
    dto::{SignupRequest, UpdateUserRequest},
    error::UserError,
    password::hash_password,
    repo_types::{User, BASE_ROLE, DEFAULT_PROVIDER},
    validation,
};

/// A user record staged for saving.
pub struct Draft {
    user: User,
    password: Option<String>,
    password_confirm: Option<String>,
    password_modified: bool,
    is_new: bool,
}

impl Draft {
    /// Stages a brand new account from a signup request.
    pub fn create(req: SignupRequest) -> Self {
        let now = OffsetDateTime::now_utc();
        let mut draft = Self {
            user: User {
                id: Uuid::new_v4(),
                email: req.email,
                username: req.username,
                first_name: req.first_name,
                last_name: req.last_name,
                password_hash: String::new(),
                is_email_verified: false,
                provider: req
                    .provider
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
                google_id: req.google_id,
                avatar: req.avatar,
                business_name: req.business_name,
                phone_number: req.phone_number,
                address: req.address,
                city: req.city,
                country: req.country,
                password_changed_at: None,
                roles: Vec::new(),
                active: true,
                refresh_token: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            password: None,
            password_confirm: None,
            password_modified: false,
            is_new: true,
        };
        if !req.password.is_empty() {
            draft.set_password(req.password, Some(req.password_confirm));
        }
        draft
    }

    /// Stages changes to an already persisted account.
    pub fn update(user: User) -> Self {
        Self {
            user,
            password: None,
            password_confirm: None,
            password_modified: false,
            is_new: false,
        }
    }

    /// Copies every field present in `patch` onto the draft.
    pub fn apply(&mut self, patch: UpdateUserRequest) {
        let u = &mut self.user;
        if let Some(v) = patch.email {
            u.email = v;
        }
        if let Some(v) = patch.username {
            u.username = v;
        }
        if let Some(v) = patch.first_name {
            u.first_name = v;
        }
        if let Some(v) = patch.last_name {
            u.last_name = v;
        }
        if patch.avatar.is_some() {
            u.avatar = patch.avatar;
        }
        if patch.business_name.is_some() {
            u.business_name = patch.business_name;
        }
        if patch.phone_number.is_some() {
            u.phone_number = patch.phone_number;
        }
        if patch.address.is_some() {
            u.address = patch.address;
        }
        if patch.city.is_some() {
            u.city = patch.city;
        }
        if patch.country.is_some() {
            u.country = patch.country;
        }
        if let Some(password) = patch.password {
            self.set_password(password, patch.password_confirm);
        }
    }

    /// Marks the password as changed in this save.
    pub fn set_password(&mut self, password: String, confirm: Option<String>) {
        self.password = Some(password);
        self.password_confirm = confirm;
        self.password_modified = true;
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    #[cfg(test)]
    pub fn user_mut(&mut self) -> &mut User {
        &mut self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn password_confirm(&self) -> Option<&str> {
        self.password_confirm.as_deref()
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_password_modified(&self) -> bool {
        self.password_modified
    }
}

/// Inputs shared by every step of one save.
#[derive(Debug, Clone, Copy)]
pub struct SaveContext {
    pub now: OffsetDateTime,
    pub hash_cost: u32,
}

type Step = fn(&mut Draft, &SaveContext) -> Result<(), UserError>;

const PRE_SAVE: [(&str, Step); 5] = [
    ("normalize", normalize),
    ("validate", validate),
    ("default_roles", default_roles),
    ("hash_password", hash_changed_password),
    ("stamp_password_change", stamp_password_change),
];

/// Runs the pre-save steps in order and hands back the record ready for storage.
///
/// Hashing is CPU-bound; async callers should run this on the blocking pool.
pub fn run(mut draft: Draft, ctx: &SaveContext) -> Result<User, UserError> {
    for (name, step) in PRE_SAVE {
        step(&mut draft, ctx)?;
        trace!(step = name, user_id = %draft.user.id, "pre-save step done");
    }
    draft.user.updated_at = ctx.now;
    Ok(draft.user)
}

fn normalize(draft: &mut Draft, _ctx: &SaveContext) -> Result<(), UserError> {
    let u = &mut draft.user;
    u.email = u.email.trim().to_lowercase();
    u.username = u.username.trim().to_string();
    u.first_name = u.first_name.trim().to_string();
    u.last_name = u.last_name.trim().to_string();
    Ok(())
}

fn validate(draft: &mut Draft, _ctx: &SaveContext) -> Result<(), UserError> {
    validation::validate(draft)?;
    Ok(())
}

fn default_roles(draft: &mut Draft, _ctx: &SaveContext) -> Result<(), UserError> {
    let roles = &mut draft.user.roles;
    let mut seen = Vec::with_capacity(roles.len());
    roles.retain(|r| {
        if seen.contains(r) {
            false
        } else {
            seen.push(r.clone());
            true
        }
    });
    if roles.is_empty() {
        roles.push(BASE_ROLE.to_string());
    }
    Ok(())
}

fn hash_changed_password(draft: &mut Draft, ctx: &SaveContext) -> Result<(), UserError> {
    if !draft.password_modified {
        return Ok(());
    }
    let Some(plain) = draft.password.take() else {
        return Ok(());
    };
    draft.user.password_hash = hash_password(&plain, ctx.hash_cost)?;
    draft.password_confirm = None;
    Ok(())
}

fn stamp_password_change(draft: &mut Draft, ctx: &SaveContext) -> Result<(), UserError> {
    if !draft.password_modified || draft.is_new {
        return Ok(());
    }
    draft.user.password_changed_at = Some(ctx.now);
    Ok(())
}
