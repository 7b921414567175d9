use super::AppState;
use crate::types::{DatasetInfo, ServiceInfo};
use axum::{Json, extract::State};

pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    let mut datasets = Vec::new();
    if let Some(engine) = &state.reads {
        datasets.push(DatasetInfo {
            datatype: "reads",
            keys: engine.keys(),
        });
    }
    if let Some(engine) = &state.variants {
        datasets.push(DatasetInfo {
            datatype: "variants",
            keys: engine.keys(),
        });
    }
    if let Some(engine) = &state.features {
        datasets.push(DatasetInfo {
            datatype: "features",
            keys: engine.keys(),
        });
    }

    Json(ServiceInfo {
        name: "materializr".to_string(),
        description: "Genome browser backend with lazy region materialization".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reference: state.reference.is_some(),
        datasets,
    })
}
