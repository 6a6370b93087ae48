mod support;

use paycontrol_core::{
    AuditAction, CommitmentPatch, CommitmentStatus, CoreError, EntityKind, NewUser,
};
use paycontrol_service::ServiceOptions;
use support::*;

#[tokio::test]
async fn commitment_walks_the_workflow_until_paid() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "10.010.010/0001-10").await;
    let created = service
        .create_commitment(&actor(), new_commitment(&supplier, "NE-1000", None, "250.00"))
        .await
        .unwrap();

    assert_eq!(created.value.status, CommitmentStatus::UnderEvaluation);
    assert_eq!(created.audit.action, AuditAction::Create);
    assert_eq!(created.audit.entity, EntityKind::Commitment);
    assert_eq!(
        created.audit.details,
        "Empenho NE-1000 criado - Status inicial: EM_AVALIACAO"
    );
    assert_eq!(created.audit.actor, "Joana Ribeiro");

    let id = created.value.id;
    let approved = service
        .change_status(&actor(), id, "APROVADO", Some("Documentação conferida".into()))
        .await
        .unwrap();
    assert_eq!(approved.value.status, CommitmentStatus::Approved);
    assert_eq!(approved.audit.action, AuditAction::StatusChange);
    assert_eq!(
        approved.audit.details,
        "Status alterado: EM_AVALIACAO → APROVADO. Motivo: Documentação conferida"
    );

    let paid = service.change_status(&actor(), id, "PAGO", None).await.unwrap();
    assert_eq!(paid.value.status, CommitmentStatus::Paid);
    assert_eq!(
        paid.audit.details,
        "Status alterado: APROVADO → PAGO. Motivo: Não informado"
    );
}

#[tokio::test]
async fn paid_commitments_are_frozen() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "11.011.011/0001-11").await;
    let created = commitment(&service, &supplier, "NE-1100", None, "90.00").await;
    service.change_status(&actor(), created.id, "APROVADO", None).await.unwrap();
    service.change_status(&actor(), created.id, "PAGO", None).await.unwrap();

    for target in ["CANCELADO", "APROVADO", "PAGO", "ARQUIVADO"] {
        let err = service
            .change_status(&actor(), created.id, target, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ImmutableState { .. }), "{target}: {err:?}");
    }

    let err = service
        .update_commitment(
            &actor(),
            created.id,
            CommitmentPatch {
                description: Some("Ajuste".into()),
                ..CommitmentPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ImmutableState");

    let err = service.delete_commitment(&actor(), created.id).await.unwrap_err();
    assert_eq!(err.kind(), "ImmutableState");

    let still_there = service.get_commitment(created.id).await.unwrap();
    assert_eq!(still_there.status, CommitmentStatus::Paid);
    assert_eq!(still_there.description, "Empenho ordinário");
}

#[tokio::test]
async fn transitions_outside_the_table_are_rejected() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "12.012.012/0001-12").await;
    let created = commitment(&service, &supplier, "NE-1200", None, "10.00").await;

    let err = service
        .change_status(&actor(), created.id, "PAGO", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::InvalidTransition {
            from: CommitmentStatus::UnderEvaluation,
            to: CommitmentStatus::Paid,
        }
    ));

    service.change_status(&actor(), created.id, "REPROVADO", None).await.unwrap();
    let reopened = service
        .change_status(&actor(), created.id, "EM_AVALIACAO", Some("Recurso".into()))
        .await
        .unwrap();
    assert_eq!(reopened.value.status, CommitmentStatus::UnderEvaluation);
}

#[tokio::test]
async fn unknown_status_code_is_reported() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "13.013.013/0001-13").await;
    let created = commitment(&service, &supplier, "NE-1300", None, "10.00").await;

    let err = service
        .change_status(&actor(), created.id, "ARQUIVADO", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnknownStatus(ref code) if code == "ARQUIVADO"));
}

#[tokio::test]
async fn commitment_numbers_stay_reserved_after_deletion() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "14.014.014/0001-14").await;
    let first = commitment(&service, &supplier, "NE-1400", None, "10.00").await;

    let err = service
        .create_commitment(&actor(), new_commitment(&supplier, "NE-1400", None, "20.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateKey { field: "number", .. }));

    let deleted = service.delete_commitment(&actor(), first.id).await.unwrap();
    assert_eq!(deleted.audit.details, "Empenho NE-1400 excluído");

    let err = service
        .create_commitment(&actor(), new_commitment(&supplier, "NE-1400", None, "20.00"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "DuplicateKey");

    let err = service.get_commitment(first.id).await.unwrap_err();
    assert_eq!(err.kind(), "NotFound");
}

#[tokio::test]
async fn invalid_input_is_rejected_before_storage() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "15.015.015/0001-15").await;

    let mut input = new_commitment(&supplier, "NE-1500", None, "0.00");
    let err = service.create_commitment(&actor(), input.clone()).await.unwrap_err();
    assert_eq!(err.kind(), "ValidationError");

    input.amount = amount("10.00");
    input.has_contract = true;
    input.contract_id = None;
    let err = service.create_commitment(&actor(), input).await.unwrap_err();
    assert_eq!(err.kind(), "ValidationError");

    assert!(service.list_commitments(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_filters_by_status() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "16.016.016/0001-16").await;
    let first = commitment(&service, &supplier, "NE-1600", None, "10.00").await;
    commitment(&service, &supplier, "NE-1601", None, "15.00").await;
    service.change_status(&actor(), first.id, "APROVADO", None).await.unwrap();

    let approved = service
        .list_commitments(Some(CommitmentStatus::Approved))
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].number, "NE-1600");

    assert_eq!(service.list_commitments(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn dashboard_counts_live_records_per_status() {
    let service = service(ServiceOptions::default());
    let supplier = supplier(&service, "17.017.017/0001-17").await;
    let contract = contract(&service, &supplier, "CT-017/2024", "1000.00").await;
    let a = commitment(&service, &supplier, "NE-1700", Some(&contract), "100.00").await;
    commitment(&service, &supplier, "NE-1701", None, "50.50").await;
    let c = commitment(&service, &supplier, "NE-1702", None, "20.00").await;
    service.change_status(&actor(), a.id, "APROVADO", None).await.unwrap();
    service.delete_commitment(&actor(), c.id).await.unwrap();

    let summary = service.dashboard().await.unwrap();
    assert_eq!(summary.suppliers_total, 1);
    assert_eq!(summary.contracts_total, 1);
    assert_eq!(summary.commitments_total, 2);
    assert_eq!(summary.commitments_value, amount("150.50"));
    assert_eq!(summary.by_status.len(), CommitmentStatus::ALL.len());

    let row = |status| {
        summary
            .by_status
            .iter()
            .find(|row| row.status == status)
            .cloned()
            .unwrap()
    };
    assert_eq!(row(CommitmentStatus::Approved).count, 1);
    assert_eq!(row(CommitmentStatus::UnderEvaluation).value, amount("50.50"));
    assert_eq!(row(CommitmentStatus::Paid).count, 0);
}

#[tokio::test]
async fn user_emails_are_unique_and_case_insensitive() {
    let service = service(ServiceOptions::default());
    let user = service
        .create_user(
            &actor(),
            NewUser {
                name: "Carlos Lima".into(),
                email: "Carlos.Lima@prefeitura.gov.br".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(user.value.email, "carlos.lima@prefeitura.gov.br");
    assert_eq!(user.audit.entity, EntityKind::User);

    let err = service
        .create_user(
            &actor(),
            NewUser {
                name: "Outro".into(),
                email: "carlos.lima@prefeitura.gov.br".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateKey { field: "email", .. }));
}
