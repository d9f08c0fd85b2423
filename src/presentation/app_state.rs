// Application state for HTTP handlers
use crate::application::push_listener::MeterPushListener;
use crate::application::query_service::CombinedViewService;

#[derive(Clone)]
pub struct AppState {
    pub view_service: CombinedViewService,
    pub push_listener: MeterPushListener,
}
