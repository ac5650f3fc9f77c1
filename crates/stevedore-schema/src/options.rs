//! Option names understood by the generator.

pub const BASE_IMAGE: &str = "BASE_IMAGE";
pub const MAINTAINER: &str = "MAINTAINER";

pub const CONTAINER_NAME: &str = "CONTAINER_NAME";
pub const CONTAINER_VERSION: &str = "CONTAINER_VERSION";
pub const CONTAINER_DESCRIPTION: &str = "CONTAINER_DESCRIPTION";
pub const CONTAINER_HOMEPAGE: &str = "CONTAINER_HOMEPAGE";
pub const LABEL: &str = "LABEL";

pub const ENV: &str = "ENV";
pub const VOLUME: &str = "VOLUME";
pub const EXPOSE: &str = "EXPOSE";
pub const RUN_PREDEPENDS: &str = "RUN_PREDEPENDS";
pub const RUN_POSTDEPENDS: &str = "RUN_POSTDEPENDS";
pub const USER: &str = "USER";
pub const WORKDIR: &str = "WORKDIR";
pub const ONBUILD: &str = "ONBUILD";
pub const ENTRYPOINT: &str = "ENTRYPOINT";
pub const CMD: &str = "CMD";

pub const PACKAGE_MANAGER: &str = "PACKAGE_MANAGER";
pub const PACKAGE_MANAGER_INSTALL: &str = "PACKAGE_MANAGER_INSTALL";
pub const PACKAGE_DEPENDS: &str = "PACKAGE_DEPENDS";

pub const BUILD_CONTAINER: &str = "BUILD_CONTAINER";
pub const DELETE_CONTAINER: &str = "DELETE_CONTAINER";
pub const BUILDER_EXECUTABLE: &str = "BUILDER_EXECUTABLE";

pub const COMPONENT_INSTALL: &str = "COMPONENT_INSTALL";
pub const COMPONENTS_IGNORE_GROUPS: &str = "COMPONENTS_IGNORE_GROUPS";
pub const COMPONENTS_ALL_IN_ONE_PACKAGE: &str = "COMPONENTS_ALL_IN_ONE_PACKAGE";
pub const COMPONENTS: &str = "COMPONENTS";

pub const PACKAGE_FILE_NAME: &str = "PACKAGE_FILE_NAME";
pub const INSTALL_PREFIX: &str = "INSTALL_PREFIX";

/// Default external image builder.
pub const DEFAULT_BUILDER: &str = "docker";

/// Name of the per-component group option, e.g. `COMPONENT_RUNTIME_GROUP`.
pub fn component_group_option(component: &str) -> String {
    format!("COMPONENT_{}_GROUP", component.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_group_option_is_upper_cased() {
        assert_eq!(component_group_option("runtime"), "COMPONENT_RUNTIME_GROUP");
        assert_eq!(component_group_option("Dev-Libs"), "COMPONENT_DEV-LIBS_GROUP");
    }
}
