pub mod build;
pub mod containers;
pub mod images;
pub mod system;
pub mod volumes;

use std::sync::Arc;

use crate::repositories::engine_client::EngineClient;

pub use build::BuildUsecase;
pub use containers::ContainerUsecase;
pub use images::ImageUsecase;
pub use system::SystemUsecase;
pub use volumes::VolumeUsecase;

/// Shared handler state: one usecase per API area, all over the same client.
pub struct AppState<C: EngineClient> {
    pub system: SystemUsecase<C>,
    pub images: ImageUsecase<C>,
    pub containers: ContainerUsecase<C>,
    pub volumes: VolumeUsecase<C>,
    pub build: BuildUsecase<C>,
}

impl<C: EngineClient> AppState<C> {
    pub fn new(client: Arc<C>) -> Self {
        AppState {
            system: SystemUsecase::new(client.clone()),
            images: ImageUsecase::new(client.clone()),
            containers: ContainerUsecase::new(client.clone()),
            volumes: VolumeUsecase::new(client.clone()),
            build: BuildUsecase::new(client),
        }
    }
}

// Derived Clone would require C: Clone; the state only holds Arcs.
impl<C: EngineClient> Clone for AppState<C> {
    fn clone(&self) -> Self {
        AppState {
            system: self.system.clone(),
            images: self.images.clone(),
            containers: self.containers.clone(),
            volumes: self.volumes.clone(),
            build: self.build.clone(),
        }
    }
}
