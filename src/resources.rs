//! The registry of resource kinds and data sources the provider manages.
//!
//! Every kind is a static [ResourceDescriptor]. Adding a kind means adding a descriptor here and
//! listing it in [RESOURCES] or [DATA_SOURCES]; the engine needs no changes.

use crate::schema::{Association, DefaultValue, Field, FieldType, ResourceDescriptor, Shape};

use DefaultValue::{Bool, Int, Str};
use FieldType::IdString;

const fn flag(name: &'static str) -> Field {
    Field::optional(name, FieldType::Bool, Bool(false))
}

const fn text(name: &'static str) -> Field {
    Field::optional(name, FieldType::String, Str(""))
}

const fn number(name: &'static str) -> Field {
    Field::optional(name, FieldType::Int, Int(0))
}

// Credential secrets live in the credential's `inputs` object.
const fn input(name: &'static str) -> Field {
    text(name).within("inputs")
}

pub static ORGANIZATION: ResourceDescriptor = ResourceDescriptor {
    name: "awx_organization",
    endpoint: "organizations",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        text("description"),
        number("max_hosts"),
        text("custom_virtualenv"),
        Field::optional("default_environment", IdString, Str("")),
    ],
};

pub static INVENTORY: ResourceDescriptor = ResourceDescriptor {
    name: "awx_inventory",
    endpoint: "inventories",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        Field::required("organization_id", FieldType::Int).remote("organization"),
        text("description"),
        text("kind"),
        text("host_filter"),
        text("variables"),
    ],
};

pub static INVENTORY_GROUP: ResourceDescriptor = ResourceDescriptor {
    name: "awx_inventory_group",
    endpoint: "groups",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        Field::required("inventory_id", FieldType::Int)
            .remote("inventory")
            .force_new(),
        text("description"),
        text("variables"),
    ],
};

pub static HOST: ResourceDescriptor = ResourceDescriptor {
    name: "awx_host",
    endpoint: "hosts",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        Field::required("inventory_id", FieldType::Int)
            .remote("inventory")
            .force_new(),
        text("description"),
        Field::optional("enabled", FieldType::Bool, Bool(true)),
        text("instance_id"),
        text("variables"),
    ],
};

pub static PROJECT: ResourceDescriptor = ResourceDescriptor {
    name: "awx_project",
    endpoint: "projects",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        Field::required("organization_id", FieldType::Int).remote("organization"),
        text("description"),
        text("scm_type"),
        text("scm_url"),
        text("scm_branch"),
        Field::optional("scm_credential_id", IdString, Str("")).remote("credential"),
        flag("scm_clean"),
        flag("scm_delete_on_update"),
        flag("scm_update_on_launch"),
        number("scm_update_cache_timeout"),
        text("local_path"),
        flag("allow_override"),
    ],
};

pub static JOB_TEMPLATE: ResourceDescriptor = ResourceDescriptor {
    name: "awx_job_template",
    endpoint: "job_templates",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        text("description"),
        // run or check
        Field::required("job_type", FieldType::String),
        Field::required("inventory_id", IdString).remote("inventory"),
        Field::required("project_id", FieldType::Int).remote("project"),
        text("playbook"),
        number("forks"),
        text("limit"),
        // 0 to 5
        number("verbosity"),
        text("extra_vars"),
        text("job_tags"),
        flag("force_handlers"),
        text("skip_tags"),
        text("start_at_task"),
        number("timeout"),
        flag("use_fact_cache"),
        text("host_config_key").sensitive(),
        flag("ask_diff_mode_on_launch"),
        flag("ask_limit_on_launch"),
        flag("ask_tags_on_launch"),
        flag("ask_verbosity_on_launch"),
        flag("ask_inventory_on_launch"),
        flag("ask_variables_on_launch"),
        flag("ask_credential_on_launch"),
        flag("survey_enabled"),
        flag("become_enabled"),
        flag("diff_mode"),
        flag("ask_skip_tags_on_launch"),
        flag("allow_simultaneous"),
        text("custom_virtualenv"),
        flag("ask_job_type_on_launch"),
        Field::optional("execution_environment", IdString, Str("")),
    ],
};

pub static WORKFLOW_JOB_TEMPLATE: ResourceDescriptor = ResourceDescriptor {
    name: "awx_workflow_job_template",
    endpoint: "workflow_job_templates",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        text("description"),
        Field::optional("organization_id", IdString, Str("")).remote("organization"),
        Field::optional("inventory_id", IdString, Str("")).remote("inventory"),
        text("limit"),
        text("scm_branch"),
        text("extra_vars"),
        flag("survey_enabled"),
        flag("allow_simultaneous"),
        flag("ask_variables_on_launch"),
        flag("ask_inventory_on_launch"),
        flag("ask_scm_branch_on_launch"),
        flag("ask_limit_on_launch"),
    ],
};

pub static INVENTORY_SOURCE: ResourceDescriptor = ResourceDescriptor {
    name: "awx_inventory_source",
    endpoint: "inventory_sources",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        text("description"),
        Field::required("inventory_id", FieldType::Int)
            .remote("inventory")
            .force_new(),
        Field::optional("source", FieldType::String, Str("scm")),
        text("source_path"),
        Field::optional("source_project_id", IdString, Str("")).remote("source_project"),
        Field::optional("credential_id", IdString, Str("")).remote("credential"),
        text("source_vars"),
        text("host_filter"),
        text("enabled_var"),
        text("enabled_value"),
        flag("overwrite"),
        flag("overwrite_vars"),
        flag("update_on_launch"),
        number("update_cache_timeout"),
        Field::optional("verbosity", FieldType::Int, Int(1)),
    ],
};

pub static CREDENTIAL_MACHINE: ResourceDescriptor = ResourceDescriptor {
    name: "awx_credential_machine",
    endpoint: "credentials",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        text("description"),
        Field::required("organization_id", FieldType::Int).remote("organization"),
        // Machine
        Field::fixed("credential_type_id", FieldType::Int, Int(1)).remote("credential_type"),
        input("username"),
        input("password").sensitive(),
        input("ssh_key_data").sensitive(),
        input("ssh_public_key_data"),
        input("ssh_key_unlock").sensitive(),
        input("become_method"),
        input("become_username"),
        input("become_password").sensitive(),
    ],
};

pub static CREDENTIAL_SCM: ResourceDescriptor = ResourceDescriptor {
    name: "awx_credential_scm",
    endpoint: "credentials",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        text("description"),
        Field::required("organization_id", FieldType::Int).remote("organization"),
        // Source Control
        Field::fixed("credential_type_id", FieldType::Int, Int(2)).remote("credential_type"),
        input("username"),
        input("password").sensitive(),
        input("ssh_key_data").sensitive(),
        input("ssh_key_unlock").sensitive(),
    ],
};

pub static WORKFLOW_JOB_TEMPLATE_NODE: ResourceDescriptor = ResourceDescriptor {
    name: "awx_workflow_job_template_node",
    endpoint: "workflow_job_template_nodes",
    shape: Shape::Object,
    fields: &[
        Field::required("workflow_job_template_id", FieldType::Int)
            .remote("workflow_job_template")
            .force_new(),
        Field::required("unified_job_template_id", FieldType::Int)
            .remote("unified_job_template"),
        Field::optional("inventory_id", IdString, Str("")).remote("inventory"),
        text("identifier"),
        Field::optional("extra_data", FieldType::String, Str("{}")),
        text("scm_branch"),
        Field::optional("job_type", FieldType::String, Str("run")),
        text("job_tags"),
        text("skip_tags"),
        text("limit"),
        flag("diff_mode"),
        number("verbosity"),
        flag("all_parents_must_converge"),
    ],
};

const NODE_LINK_FIELDS: &[Field] = &[
    Field::required("workflow_job_template_node_id", FieldType::Int).force_new(),
    Field::required("child_node_id", FieldType::Int).force_new(),
];

// Links from one workflow node to the node that runs after it.
const fn node_link(name: &'static str, relation: &'static str) -> ResourceDescriptor {
    ResourceDescriptor {
        name,
        endpoint: "workflow_job_template_nodes",
        shape: Shape::Association(Association {
            owner_field: "workflow_job_template_node_id",
            owner_endpoint: "workflow_job_template_nodes",
            member_field: "child_node_id",
            member_endpoint: "workflow_job_template_nodes",
            relation,
            owner_reference: None,
        }),
        fields: NODE_LINK_FIELDS,
    }
}

pub static WORKFLOW_JOB_TEMPLATE_NODE_SUCCESS: ResourceDescriptor =
    node_link("awx_workflow_job_template_node_success", "success_nodes");

pub static WORKFLOW_JOB_TEMPLATE_NODE_FAILURE: ResourceDescriptor =
    node_link("awx_workflow_job_template_node_failure", "failure_nodes");

pub static WORKFLOW_JOB_TEMPLATE_NODE_ALWAYS: ResourceDescriptor =
    node_link("awx_workflow_job_template_node_always", "always_nodes");

/// Attaches a credential to a job template. Identity is `<job_template_id>/<credential_id>`.
pub static JOB_TEMPLATE_CREDENTIAL: ResourceDescriptor = ResourceDescriptor {
    name: "awx_job_template_credential",
    endpoint: "job_templates",
    shape: Shape::Association(Association {
        owner_field: "job_template_id",
        owner_endpoint: "job_templates",
        member_field: "credential_id",
        member_endpoint: "credentials",
        relation: "credentials",
        owner_reference: Some("credential"),
    }),
    fields: &[
        Field::required("job_template_id", FieldType::Int).force_new(),
        Field::required("credential_id", FieldType::Int).force_new(),
    ],
};

/// Every managed resource kind.
pub static RESOURCES: &[&ResourceDescriptor] = &[
    &ORGANIZATION,
    &INVENTORY,
    &INVENTORY_GROUP,
    &HOST,
    &PROJECT,
    &JOB_TEMPLATE,
    &WORKFLOW_JOB_TEMPLATE,
    &INVENTORY_SOURCE,
    &CREDENTIAL_MACHINE,
    &CREDENTIAL_SCM,
    &WORKFLOW_JOB_TEMPLATE_NODE,
    &JOB_TEMPLATE_CREDENTIAL,
    &WORKFLOW_JOB_TEMPLATE_NODE_SUCCESS,
    &WORKFLOW_JOB_TEMPLATE_NODE_FAILURE,
    &WORKFLOW_JOB_TEMPLATE_NODE_ALWAYS,
];

// Data sources take `id` or `name` as the selector. Everything else is computed.

const fn selector_id() -> Field {
    Field::optional("id", FieldType::Int, DefaultValue::Null)
}

const fn selector_name() -> Field {
    Field::optional("name", FieldType::String, DefaultValue::Null)
}

pub mod data {
    //! Read-only lookups of existing objects by ID or name.

    use super::*;

    pub static CREDENTIAL: ResourceDescriptor = ResourceDescriptor {
        name: "awx_credential",
        endpoint: "credentials",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
            Field::computed("kind", FieldType::String),
            Field::computed("credential_type_id", FieldType::Int).remote("credential_type"),
            Field::computed("organization_id", IdString).remote("organization"),
        ],
    };

    pub static EXECUTION_ENVIRONMENT: ResourceDescriptor = ResourceDescriptor {
        name: "awx_execution_environment",
        endpoint: "execution_environments",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
            Field::computed("image", FieldType::String),
            Field::computed("pull", FieldType::String),
            Field::computed("organization_id", IdString).remote("organization"),
        ],
    };

    pub static INVENTORY: ResourceDescriptor = ResourceDescriptor {
        name: "awx_inventory",
        endpoint: "inventories",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
            Field::computed("organization_id", IdString).remote("organization"),
        ],
    };

    pub static ORGANIZATION: ResourceDescriptor = ResourceDescriptor {
        name: "awx_organization",
        endpoint: "organizations",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
        ],
    };

    pub static PROJECT: ResourceDescriptor = ResourceDescriptor {
        name: "awx_project",
        endpoint: "projects",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
            Field::computed("scm_type", FieldType::String),
            Field::computed("scm_url", FieldType::String),
            Field::computed("organization_id", IdString).remote("organization"),
        ],
    };

    pub static INVENTORY_GROUP: ResourceDescriptor = ResourceDescriptor {
        name: "awx_inventory_group",
        endpoint: "groups",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
            Field::computed("inventory_id", IdString).remote("inventory"),
            Field::computed("variables", FieldType::String),
        ],
    };

    pub static WORKFLOW_JOB_TEMPLATE: ResourceDescriptor = ResourceDescriptor {
        name: "awx_workflow_job_template",
        endpoint: "workflow_job_templates",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
            Field::computed("organization_id", IdString).remote("organization"),
            Field::computed("inventory_id", IdString).remote("inventory"),
        ],
    };

    pub static JOB_TEMPLATE: ResourceDescriptor = ResourceDescriptor {
        name: "awx_job_template",
        endpoint: "job_templates",
        shape: Shape::Object,
        fields: &[
            selector_id(),
            selector_name(),
            Field::computed("description", FieldType::String),
            Field::computed("job_type", FieldType::String),
            Field::computed("inventory_id", IdString).remote("inventory"),
            Field::computed("project_id", IdString).remote("project"),
            Field::computed("playbook", FieldType::String),
        ],
    };
}

/// Every data source.
pub static DATA_SOURCES: &[&ResourceDescriptor] = &[
    &data::CREDENTIAL,
    &data::EXECUTION_ENVIRONMENT,
    &data::INVENTORY,
    &data::INVENTORY_GROUP,
    &data::ORGANIZATION,
    &data::PROJECT,
    &data::JOB_TEMPLATE,
    &data::WORKFLOW_JOB_TEMPLATE,
];

/// Looks up a resource kind by its front-end name, e.g. `awx_job_template`.
pub fn resource(name: &str) -> Option<&'static ResourceDescriptor> {
    RESOURCES.iter().copied().find(|d| d.name == name)
}

/// Looks up a data source by its front-end name, e.g. `awx_credential`.
pub fn data_source(name: &str) -> Option<&'static ResourceDescriptor> {
    DATA_SOURCES.iter().copied().find(|d| d.name == name)
}
