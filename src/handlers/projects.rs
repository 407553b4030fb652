//! Project and material endpoints

use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::filters::{
    json_body, json_response, message_response, reject, with_auth, with_state, AuthContext,
    HandlerResult,
};
use crate::auth::Permission;
use crate::core::SharedAppState;
use crate::models::{CreateMaterial, CreateProject, UpdateMaterial, UpdateProject};
use crate::services::ProjectQuery;

pub fn routes(state: SharedAppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("projects")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(warp::query::<ProjectQuery>())
        .and(with_state(state.clone()))
        .and_then(list_projects);

    let create = warp::path!("projects")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(json_body::<CreateProject>())
        .and(with_state(state.clone()))
        .and_then(create_project);

    let get = warp::path!("projects" / String)
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(get_project);

    let update = warp::path!("projects" / String)
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(json_body::<UpdateProject>())
        .and(with_state(state.clone()))
        .and_then(update_project);

    let delete = warp::path!("projects" / String)
        .and(warp::delete())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_project);

    let metrics = warp::path!("projects" / String / "metrics")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(project_metrics);

    let list_materials = warp::path!("projects" / String / "materials")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_materials);

    let create_material = warp::path!("projects" / String / "materials")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(json_body::<CreateMaterial>())
        .and(with_state(state.clone()))
        .and_then(create_material);

    let get_material = warp::path!("materials" / String)
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(get_material);

    let update_material = warp::path!("materials" / String)
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(json_body::<UpdateMaterial>())
        .and(with_state(state.clone()))
        .and_then(update_material);

    let delete_material = warp::path!("materials" / String)
        .and(warp::delete())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(delete_material);

    list.or(create)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(metrics)
        .unify()
        .or(list_materials)
        .unify()
        .or(create_material)
        .unify()
        .or(get_material)
        .unify()
        .or(update_material)
        .unify()
        .or(delete_material)
        .unify()
        .boxed()
}

async fn list_projects(auth: AuthContext, query: ProjectQuery, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadProjects)
        .await
        .map_err(reject)?;
    let projects = state.projects.list(&user, &query).await.map_err(reject)?;
    Ok(warp::reply::json(&projects).into_response())
}

async fn create_project(auth: AuthContext, body: CreateProject, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::WriteProjects)
        .await
        .map_err(reject)?;
    let project = state.projects.create(&user, body).await.map_err(reject)?;
    Ok(json_response(&project, StatusCode::CREATED))
}

async fn get_project(id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadProjects)
        .await
        .map_err(reject)?;
    let project = state.projects.get(&user, &id).await.map_err(reject)?;
    Ok(warp::reply::json(&project).into_response())
}

async fn update_project(
    id: String,
    auth: AuthContext,
    body: UpdateProject,
    state: SharedAppState,
) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::WriteProjects)
        .await
        .map_err(reject)?;
    let project = state.projects.update(&user, &id, body).await.map_err(reject)?;
    Ok(warp::reply::json(&project).into_response())
}

async fn delete_project(id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::DeleteProjects)
        .await
        .map_err(reject)?;
    state.projects.delete(&user, &id).await.map_err(reject)?;
    Ok(message_response("Project deleted", StatusCode::OK))
}

async fn project_metrics(id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadAnalytics)
        .await
        .map_err(reject)?;
    let metrics = state.analytics.project_metrics(&user, &id).await.map_err(reject)?;
    Ok(warp::reply::json(&metrics).into_response())
}

async fn list_materials(project_id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadMaterials)
        .await
        .map_err(reject)?;
    let materials = state.materials.list(&user, &project_id).await.map_err(reject)?;
    Ok(warp::reply::json(&materials).into_response())
}

async fn create_material(
    project_id: String,
    auth: AuthContext,
    body: CreateMaterial,
    state: SharedAppState,
) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::WriteMaterials)
        .await
        .map_err(reject)?;
    let material = state
        .materials
        .create(&user, &project_id, body)
        .await
        .map_err(reject)?;
    Ok(json_response(&material, StatusCode::CREATED))
}

async fn get_material(id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadMaterials)
        .await
        .map_err(reject)?;
    let material = state.materials.get(&user, &id).await.map_err(reject)?;
    Ok(warp::reply::json(&material).into_response())
}

async fn update_material(
    id: String,
    auth: AuthContext,
    body: UpdateMaterial,
    state: SharedAppState,
) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::WriteMaterials)
        .await
        .map_err(reject)?;
    let material = state.materials.update(&user, &id, body).await.map_err(reject)?;
    Ok(warp::reply::json(&material).into_response())
}

async fn delete_material(id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::WriteMaterials)
        .await
        .map_err(reject)?;
    state.materials.delete(&user, &id).await.map_err(reject)?;
    Ok(message_response("Material deleted", StatusCode::OK))
}
