//! tests/campaign_tests.rs
//! Pruebas del registro de campaña: creación, transiciones y arranque.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use crate::errors::CampaignError;
    use crate::models::campaign_message_model::MessageStatus;
    use crate::models::campaign_model::{
        CampaignStatus, CreateCampaignRequest, ScheduleCampaignRequest,
    };
    use crate::models::contact_model::{CreateBroadcastListRequest, CreateContactRequest};
    use crate::tests::{fields, seed_contacts, test_services, FakeGateway, INSTANCE, TENANT};

    fn campaign_request(template: &str, list: Option<String>) -> CreateCampaignRequest {
        CreateCampaignRequest {
            tenant_id: TENANT.to_string(),
            name: "Black Friday".to_string(),
            message_template: template.to_string(),
            broadcast_list_id: list,
        }
    }

    fn error_kind(err: &anyhow::Error) -> Option<&CampaignError> {
        err.downcast_ref::<CampaignError>()
    }

    #[test]
    fn status_transitions_only_move_forward() {
        use CampaignStatus::*;

        assert!(Draft.can_transition_to(Scheduled));
        assert!(Draft.can_transition_to(Sending));
        assert!(Scheduled.can_transition_to(Sending));
        assert!(Sending.can_transition_to(Completed));
        assert!(Sending.can_transition_to(Failed));

        assert!(!Scheduled.can_transition_to(Draft));
        assert!(!Sending.can_transition_to(Scheduled));
        assert!(!Completed.can_transition_to(Sending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Draft.can_transition_to(Completed));
    }

    #[test]
    fn status_parses_from_text() {
        assert_eq!("SENDING".parse::<CampaignStatus>(), Ok(CampaignStatus::Sending));
        assert!("paused".parse::<CampaignStatus>().is_err());
        assert_eq!("failed".parse::<MessageStatus>(), Ok(MessageStatus::Failed));
    }

    #[actix_rt::test]
    async fn create_campaign_starts_in_draft() {
        let svc = test_services(FakeGateway::healthy()).await;
        let campaign = svc
            .campaigns
            .create_campaign(campaign_request("Olá {{nome}}", None))
            .await
            .unwrap();

        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.total_contacts, 0);
        assert_eq!((campaign.sent, campaign.delivered, campaign.failed), (0, 0, 0));
        assert!(campaign.started_at.is_none());
    }

    #[actix_rt::test]
    async fn create_campaign_validates_input() {
        let svc = test_services(FakeGateway::healthy()).await;

        let err = svc
            .campaigns
            .create_campaign(campaign_request("   ", None))
            .await
            .expect_err("empty template");
        assert!(matches!(error_kind(&err), Some(CampaignError::Validation(_))));

        let err = svc
            .campaigns
            .create_campaign(campaign_request("Oi", Some("no-such-list".to_string())))
            .await
            .expect_err("unknown list");
        assert!(matches!(error_kind(&err), Some(CampaignError::NotFound { .. })));
    }

    #[actix_rt::test]
    async fn get_unknown_campaign_is_not_found() {
        let svc = test_services(FakeGateway::healthy()).await;
        let err = svc.campaigns.get_campaign("nope").await.expect_err("missing");
        assert!(matches!(error_kind(&err), Some(CampaignError::NotFound { .. })));
    }

    #[actix_rt::test]
    async fn start_renders_and_enqueues_every_recipient() {
        let svc = test_services(FakeGateway::healthy()).await;
        svc.contacts
            .create_contact(CreateContactRequest {
                tenant_id: TENANT.to_string(),
                phone: "+55 81 99999-0001".to_string(),
                name: Some("Ana".to_string()),
                email: Some("ana@exemplo.com".to_string()),
                custom_fields: fields(&[("cupom", json!("ANA10"))]),
            })
            .await
            .unwrap();
        svc.contacts
            .create_contact(CreateContactRequest {
                tenant_id: TENANT.to_string(),
                phone: "5581999990002".to_string(),
                name: Some("Bruno".to_string()),
                email: None,
                custom_fields: Default::default(),
            })
            .await
            .unwrap();

        let campaign = svc
            .campaigns
            .create_campaign(campaign_request("Olá {{nome}}, cupom {{cupom}}", None))
            .await
            .unwrap();

        let resp = svc
            .campaigns
            .start_campaign(&campaign.id, INSTANCE)
            .await
            .unwrap();
        assert_eq!(resp.total_contacts, 2);

        let started = svc.campaigns.get_campaign(&campaign.id).await.unwrap();
        assert_eq!(started.status, CampaignStatus::Sending);
        assert_eq!(started.total_contacts, 2);
        assert_eq!(started.instance_name.as_deref(), Some(INSTANCE));
        assert!(started.started_at.is_some());

        let queued = svc.messages.list_queued(&campaign.id).await.unwrap();
        let rendered: Vec<_> = queued
            .iter()
            .map(|m| (m.phone.as_str(), m.message_content.as_str(), m.status))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("5581999990001", "Olá Ana, cupom ANA10", MessageStatus::Queued),
                ("5581999990002", "Olá Bruno, cupom ", MessageStatus::Queued),
            ]
        );
    }

    #[actix_rt::test]
    async fn start_with_zero_contacts_creates_nothing() {
        let svc = test_services(FakeGateway::healthy()).await;
        let list = svc
            .contacts
            .create_list(CreateBroadcastListRequest {
                tenant_id: TENANT.to_string(),
                name: "Vazia".to_string(),
            })
            .await
            .unwrap();
        // Contactos en el tenant, pero ninguno en la lista
        seed_contacts(&svc.contacts, 3).await;

        let campaign = svc
            .campaigns
            .create_campaign(campaign_request("Oi", Some(list.id.clone())))
            .await
            .unwrap();

        let err = svc
            .campaigns
            .start_campaign(&campaign.id, INSTANCE)
            .await
            .expect_err("no contacts");
        assert!(matches!(error_kind(&err), Some(CampaignError::NoContacts(_))));

        let counts = svc.messages.count_by_status(&campaign.id).await.unwrap();
        assert_eq!(counts.total(), 0);
        let after = svc.campaigns.get_campaign(&campaign.id).await.unwrap();
        assert_eq!(after.status, CampaignStatus::Draft);
        assert_eq!(after.total_contacts, 0);
    }

    #[actix_rt::test]
    async fn start_requires_connected_instance() {
        let svc = test_services(FakeGateway::disconnected()).await;
        seed_contacts(&svc.contacts, 2).await;
        let campaign = svc
            .campaigns
            .create_campaign(campaign_request("Oi", None))
            .await
            .unwrap();

        let err = svc
            .campaigns
            .start_campaign(&campaign.id, INSTANCE)
            .await
            .expect_err("disconnected");
        assert!(matches!(
            error_kind(&err),
            Some(CampaignError::InstanceNotConnected(_))
        ));
        assert_eq!(
            svc.messages.count_by_status(&campaign.id).await.unwrap().total(),
            0
        );
    }

    #[actix_rt::test]
    async fn campaign_cannot_be_started_twice() {
        let svc = test_services(FakeGateway::healthy()).await;
        seed_contacts(&svc.contacts, 2).await;
        let campaign = svc
            .campaigns
            .create_campaign(campaign_request("Oi", None))
            .await
            .unwrap();

        svc.campaigns
            .start_campaign(&campaign.id, INSTANCE)
            .await
            .unwrap();
        let err = svc
            .campaigns
            .start_campaign(&campaign.id, INSTANCE)
            .await
            .expect_err("second start");

        match error_kind(&err) {
            Some(CampaignError::InvalidTransition { from, to, .. }) => {
                assert_eq!(*from, CampaignStatus::Sending);
                assert_eq!(*to, CampaignStatus::Sending);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            svc.messages.count_by_status(&campaign.id).await.unwrap().queued,
            2
        );
    }

    #[actix_rt::test]
    async fn scheduled_campaign_becomes_due() {
        let svc = test_services(FakeGateway::healthy()).await;
        let campaign = svc
            .campaigns
            .create_campaign(campaign_request("Oi", None))
            .await
            .unwrap();

        let at = Utc::now() + Duration::minutes(10);
        let scheduled = svc
            .campaigns
            .schedule_campaign(
                &campaign.id,
                ScheduleCampaignRequest {
                    scheduled_at: at,
                    instance_name: INSTANCE.to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(scheduled.status, CampaignStatus::Scheduled);
        assert_eq!(scheduled.instance_name.as_deref(), Some(INSTANCE));

        let due_now = svc.campaigns.due_scheduled(Utc::now()).await.unwrap();
        assert!(due_now.is_empty());

        let due_later = svc
            .campaigns
            .due_scheduled(at + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(due_later.len(), 1);
        assert_eq!(due_later[0].id, campaign.id);

        // Ya programada: no se puede volver a programar
        let err = svc
            .campaigns
            .schedule_campaign(
                &campaign.id,
                ScheduleCampaignRequest {
                    scheduled_at: at,
                    instance_name: INSTANCE.to_string(),
                },
            )
            .await
            .expect_err("reschedule");
        assert!(matches!(
            error_kind(&err),
            Some(CampaignError::InvalidTransition { .. })
        ));
    }

    #[actix_rt::test]
    async fn fail_campaign_only_from_sending() {
        let svc = test_services(FakeGateway::healthy()).await;
        seed_contacts(&svc.contacts, 1).await;
        let campaign = svc
            .campaigns
            .create_campaign(campaign_request("Oi", None))
            .await
            .unwrap();

        let err = svc
            .campaigns
            .fail_campaign(&campaign.id, "db down")
            .await
            .expect_err("draft cannot fail");
        assert!(matches!(
            error_kind(&err),
            Some(CampaignError::InvalidTransition { .. })
        ));

        svc.campaigns
            .start_campaign(&campaign.id, INSTANCE)
            .await
            .unwrap();
        svc.campaigns
            .fail_campaign(&campaign.id, "db down")
            .await
            .unwrap();

        let failed = svc.campaigns.get_campaign(&campaign.id).await.unwrap();
        assert_eq!(failed.status, CampaignStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("db down"));
        assert!(failed.completed_at.is_some());

        // Terminal: no vuelve a completed
        assert!(svc
            .campaigns
            .complete_campaign(&campaign.id)
            .await
            .is_err());
    }
}
