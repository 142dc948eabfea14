use std::sync::Arc;

use crate::{
    config::CapacityLimits,
    db::DbPool,
    events::EventSender,
    repositories::PageAccessStore,
    services::{
        blocks::BlockService, dashboard::DashboardService, identity::IdentityResolver,
        projects::ProjectService, stock::StockService,
        supervisors::SupervisorService, units::UnitService,
    },
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    page_access: Arc<dyn PageAccessStore>,
    limits: CapacityLimits,
}

impl ServiceFactory {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        page_access: Arc<dyn PageAccessStore>,
        limits: CapacityLimits,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            page_access,
            limits,
        }
    }

    pub fn identity_resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.db_pool.clone())
    }

    pub fn project_service(&self) -> ProjectService {
        ProjectService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn block_service(&self) -> BlockService {
        BlockService::new(self.db_pool.clone(), self.event_sender.clone(), self.limits)
    }

    pub fn unit_service(&self) -> UnitService {
        UnitService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn stock_service(&self) -> StockService {
        StockService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn dashboard_service(&self) -> DashboardService {
        DashboardService::new(self.db_pool.clone())
    }

    pub fn supervisor_service(&self) -> SupervisorService {
        SupervisorService::new(
            self.db_pool.clone(),
            self.page_access.clone(),
            self.event_sender.clone(),
        )
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub identity: Arc<IdentityResolver>,
    pub projects: Arc<ProjectService>,
    pub blocks: Arc<BlockService>,
    pub units: Arc<UnitService>,
    pub stock: Arc<StockService>,
    pub dashboard: Arc<DashboardService>,
    pub supervisors: Arc<SupervisorService>,
}

impl ServiceContainer {
    /// Creates a new service container with all services initialized
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            identity: Arc::new(factory.identity_resolver()),
            projects: Arc::new(factory.project_service()),
            blocks: Arc::new(factory.block_service()),
            units: Arc::new(factory.unit_service()),
            stock: Arc::new(factory.stock_service()),
            dashboard: Arc::new(factory.dashboard_service()),
            supervisors: Arc::new(factory.supervisor_service()),
        }
    }
}
