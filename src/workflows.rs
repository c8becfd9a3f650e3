//! Multi-entity mutations. Each workflow opens one unit of work, performs every
//! step inside it and commits once; any `?` drops the unit of work and rolls
//! the whole cascade back.

use crate::{
    error::{AppError, Conflict, Entity},
    models::{User, UserPatch},
    repository::{Repository, UnitOfWork},
    tokens::TokenRegistry,
};

/// Rows removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub participations: u64,
    pub stands: u64,
    pub objects: u64,
}

/// Outcome of an account deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserDeletion {
    pub reassigned_events: u64,
    pub participations: u64,
    pub revoked_tokens: usize,
}

/// Deletes one stand and its objects. Returns the number of objects removed.
async fn remove_stand(uow: &mut dyn UnitOfWork, id_stand: i32) -> Result<u64, AppError> {
    let objects = uow.delete_objects_for_stand(id_stand).await?;
    uow.delete_stand(id_stand).await?;
    Ok(objects)
}

/// Deletes every stand of an event, objects first.
async fn remove_stands_of_event(
    uow: &mut dyn UnitOfWork,
    id_event: i32,
) -> Result<CascadeReport, AppError> {
    let mut report = CascadeReport::default();
    for stand in uow.get_stands_for_event(id_event).await? {
        report.objects += remove_stand(uow, stand.id).await?;
        report.stands += 1;
    }
    Ok(report)
}

/// delete_event
///
/// Removes an event with its participations, its stands and their objects.
pub async fn delete_event(repo: &dyn Repository, id_event: i32) -> Result<CascadeReport, AppError> {
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let participations = uow.delete_participations_for_event(id_event).await?;
    let mut report = remove_stands_of_event(uow.as_mut(), id_event).await?;
    report.participations = participations;
    uow.delete_event(id_event).await?;
    uow.commit().await?;

    tracing::info!(
        id_event,
        participations = report.participations,
        stands = report.stands,
        objects = report.objects,
        "event deleted"
    );
    Ok(report)
}

pub async fn delete_stand(repo: &dyn Repository, id_stand: i32) -> Result<CascadeReport, AppError> {
    let mut uow = repo.begin().await?;
    if !uow.stand_exists(id_stand).await? {
        return Err(AppError::NotFound(Entity::Stand));
    }
    let objects = remove_stand(uow.as_mut(), id_stand).await?;
    uow.commit().await?;

    tracing::info!(id_stand, objects, "stand deleted");
    Ok(CascadeReport {
        stands: 1,
        objects,
        ..Default::default()
    })
}

/// Succeeds on an event without stands.
pub async fn delete_all_stands_for_event(
    repo: &dyn Repository,
    id_event: i32,
) -> Result<CascadeReport, AppError> {
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let report = remove_stands_of_event(uow.as_mut(), id_event).await?;
    uow.commit().await?;

    tracing::info!(
        id_event,
        stands = report.stands,
        objects = report.objects,
        "event stands deleted"
    );
    Ok(report)
}

pub async fn delete_product(
    repo: &dyn Repository,
    id_product: i32,
) -> Result<CascadeReport, AppError> {
    let mut uow = repo.begin().await?;
    if !uow.product_exists(id_product).await? {
        return Err(AppError::NotFound(Entity::Product));
    }
    let objects = uow.delete_objects_for_product(id_product).await?;
    uow.delete_product(id_product).await?;
    uow.commit().await?;

    tracing::info!(id_product, objects, "product deleted");
    Ok(CascadeReport {
        objects,
        ..Default::default()
    })
}

/// delete_user
///
/// Removes the `target` account on behalf of the admin `caller`. Events the
/// target created are handed over to the caller (only the creator column
/// changes), its participations are removed, then the account itself.
///
/// The registry is purged after the commit; a rolled back deletion leaves the
/// target's tokens valid.
pub async fn delete_user(
    repo: &dyn Repository,
    registry: &TokenRegistry,
    caller: &str,
    target: &str,
) -> Result<UserDeletion, AppError> {
    if caller == target {
        return Err(AppError::CannotDeleteSelf);
    }
    let mut uow = repo.begin().await?;
    if !uow.user_exists(target).await? {
        return Err(AppError::NotFound(Entity::User));
    }
    let reassigned_events = uow.reassign_events(target, caller).await?;
    let participations = uow.delete_participations_for_user(target).await?;
    uow.delete_user(target).await?;
    uow.commit().await?;

    let revoked_tokens = registry.revoke_all(target);
    tracing::info!(
        mail_address = %target,
        new_owner = %caller,
        reassigned_events,
        participations,
        revoked_tokens,
        "user deleted"
    );
    Ok(UserDeletion {
        reassigned_events,
        participations,
        revoked_tokens,
    })
}

/// update_user
///
/// Admin update of an account. When the patch carries a new mail address the
/// rename cascades, in order, to the user's participations and to the creator
/// column of their events before the user row itself is rewritten. Fields the
/// patch leaves out keep their stored value.
///
/// After a committed rename every token of the old address is revoked. The
/// same happens when the name or role changes, since both travel inside the
/// issued tokens.
pub async fn update_user(
    repo: &dyn Repository,
    registry: &TokenRegistry,
    target: &str,
    patch: UserPatch,
) -> Result<User, AppError> {
    if patch.is_empty() {
        return Err(AppError::NothingToUpdate);
    }
    let mut uow = repo.begin().await?;
    let Some(current) = uow.get_user(target).await? else {
        return Err(AppError::NotFound(Entity::User));
    };

    let renamed_to = patch
        .mail_address
        .clone()
        .filter(|new_address| new_address != target);
    if let Some(new_address) = &renamed_to {
        if uow.user_exists(new_address).await? {
            return Err(AppError::Conflict(Conflict::AlreadyRegistered));
        }
        uow.rename_participations(target, new_address).await?;
        uow.reassign_events(target, new_address).await?;
    }

    let (previous_name, previous_role) = (current.name.clone(), current.role);
    let updated = uow
        .update_user(target, &patch.apply(current))
        .await?
        .ok_or(AppError::NotFound(Entity::User))?;
    uow.commit().await?;

    if let Some(new_address) = renamed_to {
        let revoked_tokens = registry.revoke_all(target);
        tracing::info!(
            old_mail_address = %target,
            new_mail_address = %new_address,
            revoked_tokens,
            "user renamed"
        );
    } else if updated.name != previous_name || updated.role != previous_role {
        // Issued tokens embed the name and role.
        let revoked_tokens = registry.revoke_all(target);
        tracing::info!(mail_address = %target, revoked_tokens, "user identity updated");
    } else {
        tracing::info!(mail_address = %target, "user updated");
    }
    Ok(updated)
}
