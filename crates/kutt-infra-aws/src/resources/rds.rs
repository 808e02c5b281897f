//! RDS: subnet groups and database instances

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};

pub const SUBNET_GROUP: &str = "aws:rds/subnetGroup:SubnetGroup";
pub const INSTANCE: &str = "aws:rds/instance:Instance";

#[derive(Debug, Clone)]
pub struct SubnetGroupArgs {
    pub description: String,
    pub subnet_ids: Output<Vec<String>>,
    pub tags: Tags,
}

impl IntoProperties for SubnetGroupArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set_value("description", &self.description)
            .set("subnet_ids", &self.subnet_ids)
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct SubnetGroup {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub arn: Output<String>,
}

impl Resource for SubnetGroup {
    const TYPE_TOKEN: &'static str = SUBNET_GROUP;

    type Args = SubnetGroupArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            name: resource.output("name"),
            arn: resource.output("arn"),
            urn: resource.urn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceArgs {
    pub db_subnet_group_name: Output<String>,
    pub allocated_storage: u32,
    pub copy_tags_to_snapshot: bool,
    pub db_name: String,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub port: u16,
    pub vpc_security_group_ids: Output<Vec<String>>,
    pub username: String,
    pub password: Output<String>,
    pub skip_final_snapshot: bool,
    pub final_snapshot_identifier: Output<String>,
    pub tags: Tags,
}

impl IntoProperties for InstanceArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set("db_subnet_group_name", &self.db_subnet_group_name)
            .set_value("allocated_storage", self.allocated_storage)
            .set_value("copy_tags_to_snapshot", self.copy_tags_to_snapshot)
            .set_value("db_name", &self.db_name)
            .set_value("engine", &self.engine)
            .set_value("engine_version", &self.engine_version)
            .set_value("instance_class", &self.instance_class)
            .set_value("port", self.port)
            .set("vpc_security_group_ids", &self.vpc_security_group_ids)
            .set_value("username", &self.username)
            .set("password", &self.password.clone().as_secret())
            .set_value("skip_final_snapshot", self.skip_final_snapshot)
            .set("final_snapshot_identifier", &self.final_snapshot_identifier)
            .set_value("tags", &self.tags)
            .build()
    }
}

/// A managed database instance
#[derive(Debug, Clone)]
pub struct Instance {
    pub urn: Urn,
    pub id: Output<String>,
    pub arn: Output<String>,
    pub address: Output<String>,
    pub endpoint: Output<String>,
    pub port: Output<u16>,
    pub db_name: Output<String>,
    pub username: Output<String>,

    /// Always secret
    pub password: Output<String>,
}

impl Resource for Instance {
    const TYPE_TOKEN: &'static str = INSTANCE;

    type Args = InstanceArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            arn: resource.output("arn"),
            address: resource.output("address"),
            endpoint: resource.output("endpoint"),
            port: resource.output("port"),
            db_name: resource.output("db_name"),
            username: resource.output("username"),
            password: resource.output::<String>("password").as_secret(),
            urn: resource.urn,
        }
    }
}
