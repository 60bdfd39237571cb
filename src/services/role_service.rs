// src/services/role_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, UserRepository},
    models::{
        auth::{Role, RoleSwitchResponse, RoleView, User},
        notifications::AuditLog,
    },
    services::auth::SessionTokens,
};

/// Calcula (papel, papel original) depois de uma troca pedida por `view`.
/// Só quem é admin (de fato ou simulando) pode trocar; voltar para admin encerra a simulação.
pub fn plan_switch(view: RoleView, target: Role) -> Result<(Role, Option<Role>), AppError> {
    if !view.is_admin() {
        return Err(AppError::Forbidden("Somente administradores podem simular papéis.".into()));
    }
    if target == Role::Admin {
        return Ok((Role::Admin, None));
    }
    Ok((target, Some(Role::Admin)))
}

/// Desfaz a simulação: o papel original volta a ser o efetivo.
pub fn plan_restore(view: RoleView) -> Result<(Role, Option<Role>), AppError> {
    match view.original {
        Some(original) if view.is_simulating() => Ok((original, None)),
        _ => Err(AppError::BadRequest("Nenhuma simulação de papel ativa.".into())),
    }
}

#[derive(Clone)]
pub struct RoleService {
    user_repo: UserRepository,
    audit_repo: AuditRepository,
    tokens: SessionTokens,
    pool: PgPool,
}

impl RoleService {
    pub fn new(user_repo: UserRepository, audit_repo: AuditRepository, tokens: SessionTokens, pool: PgPool) -> Self {
        Self { user_repo, audit_repo, tokens, pool }
    }

    async fn load(&self, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Usuário {}", user_id)))
    }

    // A decisão usa o estado do banco, não as claims do token.
    async fn apply(
        &self,
        actor: &User,
        target_user: Uuid,
        (role, original_role): (Role, Option<Role>),
        action: &str,
    ) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;
        let updated = self.user_repo.set_roles(&mut *tx, target_user, role, original_role).await?;
        self.audit_repo
            .record(
                &mut *tx,
                actor.id,
                action,
                Some(target_user),
                json!({
                    "fromRole": actor.role,
                    "toRole": role,
                    "originalRole": original_role,
                }),
            )
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn switch_role(&self, actor_id: Uuid, target: Role) -> Result<RoleSwitchResponse, AppError> {
        let actor = self.load(actor_id).await?;
        let plan = plan_switch(actor.role_view(), target)?;
        let updated = self.apply(&actor, actor.id, plan, "role.switch").await?;

        tracing::info!("Admin {} agora atua como {}.", actor.id, updated.role);
        self.response_for(&updated)
    }

    pub async fn restore_role(&self, actor_id: Uuid) -> Result<RoleSwitchResponse, AppError> {
        let actor = self.load(actor_id).await?;
        let plan = plan_restore(actor.role_view())?;
        let updated = self.apply(&actor, actor.id, plan, "role.restore").await?;

        tracing::info!("Usuário {} voltou ao papel {}.", actor.id, updated.role);
        self.response_for(&updated)
    }

    /// Troca definitiva do papel de outro usuário, feita por um admin.
    pub async fn set_user_role(&self, admin_id: Uuid, user_id: Uuid, role: Role) -> Result<User, AppError> {
        let admin = self.load(admin_id).await?;
        if !admin.role_view().is_admin() {
            return Err(AppError::Forbidden("Somente administradores podem alterar papéis.".into()));
        }
        let target = self.load(user_id).await?;
        let updated = self.apply(&admin, target.id, (role, None), "role.set").await?;

        tracing::info!("Admin {} alterou o papel de {} para {}.", admin.id, target.id, role);
        Ok(updated)
    }

    pub async fn list_audit_logs(&self, limit: i64) -> Result<Vec<AuditLog>, AppError> {
        self.audit_repo.list_recent(limit.clamp(1, 500)).await
    }

    fn response_for(&self, user: &User) -> Result<RoleSwitchResponse, AppError> {
        Ok(RoleSwitchResponse {
            token: self.tokens.issue_session(user)?,
            role: user.role,
            original_role: user.original_role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_switch_records_original_admin() {
        let plan = plan_switch(RoleView::new(Role::Admin, None), Role::Seller).unwrap();
        assert_eq!(plan, (Role::Seller, Some(Role::Admin)));
    }

    #[test]
    fn simulating_admin_can_hop_between_roles() {
        let view = RoleView::new(Role::Seller, Some(Role::Admin));
        assert_eq!(plan_switch(view, Role::Delivery).unwrap(), (Role::Delivery, Some(Role::Admin)));
        assert_eq!(plan_switch(view, Role::Admin).unwrap(), (Role::Admin, None));
    }

    #[test]
    fn non_admin_cannot_switch() {
        let err = plan_switch(RoleView::new(Role::Seller, None), Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn restore_requires_active_simulation() {
        assert_eq!(
            plan_restore(RoleView::new(Role::Support, Some(Role::Admin))).unwrap(),
            (Role::Admin, None)
        );
        assert!(matches!(
            plan_restore(RoleView::new(Role::Admin, None)),
            Err(AppError::BadRequest(_))
        ));
    }
}
