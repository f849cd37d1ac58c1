// src/services/notification_service.rs

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::{
        deal::{Deal, DealStatus},
        notification::{NewNotification, Notification, NotificationKind},
        project::Project,
    },
};

// =============================================================================
//  OUTBOX
// =============================================================================

/// Fila em memória entre as transições e a gravação das notificações.
///
/// `enqueue` nunca bloqueia e nunca falha: fila cheia ou fechada vira um
/// `warn!` e a notificação é descartada. A transição que a gerou segue normal.
#[derive(Clone)]
pub struct NotificationOutbox {
    sender: mpsc::Sender<NewNotification>,
}

impl NotificationOutbox {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NewNotification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, notification: NewNotification) {
        if let Err(e) = self.sender.try_send(notification) {
            let dropped = match &e {
                mpsc::error::TrySendError::Full(n) | mpsc::error::TrySendError::Closed(n) => n,
            };
            tracing::warn!(
                recipient = %dropped.recipient,
                kind = ?dropped.kind,
                "Notificação descartada: {}",
                e
            );
        }
    }

    pub fn enqueue_all(&self, notifications: impl IntoIterator<Item = NewNotification>) {
        for notification in notifications {
            self.enqueue(notification);
        }
    }
}

/// Consome o outbox até todos os remetentes serem dropados.
pub async fn run_outbox_worker(
    repo: NotificationRepository,
    mut receiver: mpsc::Receiver<NewNotification>,
) {
    while let Some(notification) = receiver.recv().await {
        if let Err(e) = repo.create(&notification).await {
            tracing::warn!(
                recipient = %notification.recipient,
                "Falha ao gravar notificação: {}",
                e
            );
        }
    }
    tracing::info!("Outbox de notificações encerrado");
}

// =============================================================================
//  DESTINATÁRIOS E MENSAGENS
// =============================================================================

/// Notificações do envio para verificação.
///
/// Todo verificador recebe o aviso do deal. Cada supervisor dos projetos
/// recebe um único aviso de atribuição (o do primeiro projeto dele), a não
/// ser que já tenha sido avisado como verificador.
pub fn submission_notices(
    deal: &Deal,
    submitted_by: &str,
    verifiers: &[String],
    projects: &[Project],
) -> Vec<NewNotification> {
    let mut notified = HashSet::new();
    let mut notices = Vec::new();

    for verifier in verifiers {
        if !notified.insert(verifier.as_str()) {
            continue;
        }
        notices.push(
            NewNotification::new(
                verifier.as_str(),
                NotificationKind::DealVerification,
                format!(
                    "New deal '{}' has been submitted for verification by {}.",
                    deal.title, submitted_by
                ),
            )
            .with_link(format!("/verifier/deals/{}/", deal.id))
            .with_deal(deal.id),
        );
    }

    for project in projects {
        if project.supervisor.is_empty() || !notified.insert(project.supervisor.as_str()) {
            continue;
        }
        notices.push(
            NewNotification::new(
                project.supervisor.as_str(),
                NotificationKind::ProjectAssignment,
                format!(
                    "You've been assigned as supervisor for project '{}' in deal '{}'.",
                    project.name, deal.title
                ),
            )
            .with_link(format!("/supervisor/projects/{}/", project.id))
            .with_deal(deal.id)
            .with_project(project.id),
        );
    }

    notices
}

/// Aviso ao criador do deal sobre o resultado da verificação.
pub fn verification_notice(deal: &Deal, status: DealStatus, reason: Option<&str>) -> NewNotification {
    let message = format!("Deal {} has been {}. {}", deal.id, status, reason.unwrap_or_default());

    NewNotification::new(
        deal.created_by.as_str(),
        NotificationKind::DealStatus,
        message.trim_end(),
    )
    .with_deal(deal.id)
}

/// Aviso ao supervisor de um projeto criado junto com o deal.
pub fn assignment_notice(deal: &Deal, project: &Project) -> NewNotification {
    NewNotification::new(
        project.supervisor.as_str(),
        NotificationKind::ProjectAssignment,
        format!(
            "You have been assigned to project '{}' for deal '{}'.",
            project.name, deal.title
        ),
    )
    .with_link(format!("/supervisor/projects/{}/", project.id))
    .with_deal(deal.id)
    .with_project(project.id)
}

// =============================================================================
//  CONSULTA
// =============================================================================

#[derive(Clone)]
pub struct NotificationService {
    repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo }
    }

    pub async fn list_for_recipient(&self, recipient: &str) -> Result<Vec<Notification>, AppError> {
        self.repo.list_for_recipient(recipient).await
    }
}
