//! Shared fixtures for loader tests.

use std::sync::Arc;

use trustgate::engine::{DescriptorModel, InMemoryDescriptors, InMemoryEngine};
use trustgate::loader::GuardedLoader;
use trustgate::policy::{AllowList, DecisionLog, TrustBoundary};
use trustgate::types::{ArtifactCoordinate, RepositoryRef, DEFAULT_REPOSITORY_URL};

pub const ATTACKER_URL: &str = "http://attacker.example/repo";
pub const DESCRIPTOR_PATH: &str = "/work/project.toml";

pub fn coord(s: &str) -> ArtifactCoordinate {
    s.parse().expect("test coordinate")
}

pub fn descriptor(toml: &str) -> DescriptorModel {
    DescriptorModel::from_toml_str(toml).expect("test descriptor")
}

/// Loader whose caller-trusted repositories are the default public one,
/// the way a default configuration sets it up.
pub fn loader(allow_list: AllowList, engine: Arc<InMemoryEngine>) -> GuardedLoader {
    loader_with_descriptors(allow_list, engine, InMemoryDescriptors::new())
}

pub fn loader_with_descriptors(
    allow_list: AllowList,
    engine: Arc<InMemoryEngine>,
    descriptors: InMemoryDescriptors,
) -> GuardedLoader {
    let boundary = TrustBoundary::new(allow_list, DecisionLog::new());
    let mut loader = GuardedLoader::new(boundary, engine, Arc::new(descriptors));
    loader
        .trust_repositories(vec![RepositoryRef::default_public()])
        .expect("trust default");
    loader
        .trust_plugin_repositories(vec![RepositoryRef::default_public()])
        .expect("trust default plugins");
    loader
}

pub fn allow_list_with(extensions: &[&str]) -> AllowList {
    let mut allow_list = AllowList::seeded();
    for key in extensions {
        allow_list.allow_extension(key).expect("allow extension");
    }
    allow_list
}

pub fn central_engine(published: &[&str]) -> InMemoryEngine {
    published.iter().fold(InMemoryEngine::new(), |engine, c| {
        engine.publish(DEFAULT_REPOSITORY_URL, &coord(c), format!("/cache/{c}.jar"))
    })
}
