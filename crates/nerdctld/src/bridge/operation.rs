use strum::{AsRefStr, Display};

/// Container operation requested through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// `POST /{version}/containers/create`.
    ContainerCreate,
    /// `POST /{version}/containers/{id}/start`.
    ContainerStart,
    /// `POST /{version}/containers/{id}/stop`.
    ContainerStop,
    /// `POST /{version}/containers/{id}/kill`.
    ContainerKill,
    /// `DELETE /{version}/containers/{id}`.
    ContainerRemove,
}

impl Operation {
    /// API resource the operation acts on.
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::ContainerCreate
            | Self::ContainerStart
            | Self::ContainerStop
            | Self::ContainerKill
            | Self::ContainerRemove => "containers",
        }
    }

    /// Subcommand words selecting the operation in the command pipeline.
    #[must_use]
    pub const fn command_path(self) -> &'static [&'static str] {
        match self {
            Self::ContainerCreate => &["container", "create"],
            Self::ContainerStart => &["container", "start"],
            Self::ContainerStop => &["container", "stop"],
            Self::ContainerKill => &["container", "kill"],
            Self::ContainerRemove => &["container", "rm"],
        }
    }
}
