use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    services::{
        client_portal::ClientPortalService, deployments::DeploymentService,
        expenses::ExpenseService, forecasting::ForecastingService, parts::PartService,
        procurements::ProcurementService, properties::PropertyService, sales::SaleService,
        users::UserService, vat::VatPolicy,
    },
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    vat: VatPolicy,
}

impl ServiceFactory {
    /// Creates a new service factory with the given dependencies
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        config: Arc<AppConfig>,
    ) -> Result<Self, ServiceError> {
        let vat = VatPolicy::from_rate(config.vat_rate)?;
        Ok(Self {
            db_pool,
            event_sender: Arc::new(event_sender),
            config,
            vat,
        })
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.config.clone(),
        )
    }

    pub fn property_service(&self) -> PropertyService {
        PropertyService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn part_service(&self) -> PartService {
        PartService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn procurement_service(&self) -> ProcurementService {
        ProcurementService::new(self.db_pool.clone(), self.event_sender.clone(), self.vat)
    }

    pub fn deployment_service(&self) -> DeploymentService {
        DeploymentService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn sale_service(&self) -> SaleService {
        SaleService::new(self.db_pool.clone(), self.event_sender.clone(), self.vat)
    }

    pub fn expense_service(&self) -> ExpenseService {
        ExpenseService::new(self.db_pool.clone(), self.event_sender.clone(), self.vat)
    }

    pub fn forecasting_service(&self) -> ForecastingService {
        ForecastingService::new(self.db_pool.clone(), self.config.as_ref().into())
    }

    pub fn client_portal_service(&self) -> ClientPortalService {
        ClientPortalService::new(self.db_pool.clone())
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub users: Arc<UserService>,
    pub properties: Arc<PropertyService>,
    pub parts: Arc<PartService>,
    pub procurements: Arc<ProcurementService>,
    pub deployments: Arc<DeploymentService>,
    pub sales: Arc<SaleService>,
    pub expenses: Arc<ExpenseService>,
    pub forecasting: Arc<ForecastingService>,
    pub client_portal: Arc<ClientPortalService>,
}

impl ServiceContainer {
    /// Creates a new service container with all services initialized
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            users: Arc::new(factory.user_service()),
            properties: Arc::new(factory.property_service()),
            parts: Arc::new(factory.part_service()),
            procurements: Arc::new(factory.procurement_service()),
            deployments: Arc::new(factory.deployment_service()),
            sales: Arc::new(factory.sale_service()),
            expenses: Arc::new(factory.expense_service()),
            forecasting: Arc::new(factory.forecasting_service()),
            client_portal: Arc::new(factory.client_portal_service()),
        }
    }
}
