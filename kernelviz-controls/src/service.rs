use crate::Result;
use async_trait::async_trait;
use kernelviz_models::{
    Expression, GridSize, GridSnapshot, KernelSize, PlaybackState, StepResult, UpdateResponse,
};

/// The backend that owns the grid, the kernel and the playing flag.
#[async_trait]
pub trait ConvolutionService: Send + Sync + 'static {
    async fn grid(&self) -> Result<GridSnapshot>;
    async fn update_grid_size(&self, grid_size: GridSize) -> Result<UpdateResponse>;
    async fn update_kernel_size(&self, kernel_size: KernelSize) -> Result<UpdateResponse>;
    async fn apply_expression(&self, expression: &Expression) -> Result<UpdateResponse>;
    async fn process_step(&self) -> Result<StepResult>;
    async fn toggle_play(&self) -> Result<PlaybackState>;
    async fn toggle_display_mode(&self) -> Result<UpdateResponse>;
}

#[async_trait]
impl ConvolutionService for kernelviz_client::Client {
    async fn grid(&self) -> Result<GridSnapshot> {
        Ok(kernelviz_client::Client::grid(self).await?)
    }

    async fn update_grid_size(&self, grid_size: GridSize) -> Result<UpdateResponse> {
        Ok(kernelviz_client::Client::update_grid_size(self, grid_size).await?)
    }

    async fn update_kernel_size(&self, kernel_size: KernelSize) -> Result<UpdateResponse> {
        Ok(kernelviz_client::Client::update_kernel_size(self, kernel_size).await?)
    }

    async fn apply_expression(&self, expression: &Expression) -> Result<UpdateResponse> {
        Ok(kernelviz_client::Client::apply_expression(self, expression).await?)
    }

    async fn process_step(&self) -> Result<StepResult> {
        Ok(kernelviz_client::Client::process_step(self).await?)
    }

    async fn toggle_play(&self) -> Result<PlaybackState> {
        Ok(kernelviz_client::Client::toggle_play(self).await?)
    }

    async fn toggle_display_mode(&self) -> Result<UpdateResponse> {
        Ok(kernelviz_client::Client::toggle_display_mode(self).await?)
    }
}
