use crate::planner::Planner;

#[derive(Clone)]
pub struct AppState {
    pub planner: Planner,
}
