//! Private relational database

use super::{network_boundary, require_port, require_subnets};
use crate::error::{ComponentError, Result};
use crate::resources::rds::{self, InstanceArgs, SubnetGroupArgs};
use crate::resources::ssm::{Parameter, ParameterArgs};
use crate::resources::{Tags, ec2::SecurityGroup, one};
use kutt_infra_core::{ComponentResource, Output, ResourceOptions, Stack};
use kutt_infra_random::{RandomPassword, RandomPasswordArgs, RandomString, RandomStringArgs};

pub const TYPE_TOKEN: &str = "kutt:index:PrivateDatabase";

/// Symbols allowed in generated administrator passwords
pub const PASSWORD_SYMBOLS: &str = "@";

#[derive(Debug, Clone)]
pub struct PrivateDatabaseArgs {
    pub vpc_id: Output<String>,
    pub subnet_ids: Output<Vec<String>>,
    pub db_name: String,

    /// Production databases take a final snapshot when deleted
    pub production: bool,

    /// Allocated storage in GiB
    pub disk_size: u32,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub username: String,

    /// Generated when absent
    pub password: Option<Output<String>>,
    pub port: u16,
    pub tags: Tags,
}

impl PrivateDatabaseArgs {
    pub fn new(
        vpc_id: Output<String>,
        subnet_ids: Output<Vec<String>>,
        db_name: impl Into<String>,
    ) -> Self {
        Self {
            vpc_id,
            subnet_ids,
            db_name: db_name.into(),
            production: false,
            disk_size: 10,
            engine: "postgres".to_string(),
            engine_version: "13.7".to_string(),
            instance_class: "db.t3.micro".to_string(),
            username: "administrator".to_string(),
            password: None,
            port: 5432,
            tags: Tags::new(),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        require_port("PrivateDatabase", name, self.port)?;
        if self.disk_size == 0 {
            return Err(ComponentError::InvalidArgument {
                component: "PrivateDatabase",
                name: name.to_string(),
                message: "disk_size must be at least 1 GiB".to_string(),
            });
        }
        Ok(())
    }
}

/// A database reachable only from inside its VPC
#[derive(Debug, Clone)]
pub struct PrivateDatabase {
    pub component: ComponentResource,
    pub subnet_group: rds::SubnetGroup,
    pub security_group: SecurityGroup,

    /// Present when no password was supplied
    pub generated_password: Option<RandomPassword>,
    pub snapshot_suffix: RandomString,
    pub instance: rds::Instance,

    /// SecureString parameter holding the administrator password
    pub admin_password: Parameter,
}

impl PrivateDatabase {
    pub fn new(
        stack: &Stack,
        name: &str,
        args: PrivateDatabaseArgs,
        options: ResourceOptions,
    ) -> Result<Self> {
        args.validate(name)?;
        let subnet_ids = require_subnets("PrivateDatabase", name, &args.subnet_ids)?;

        let component = stack.component(TYPE_TOKEN, name, options)?;

        let subnet_group = stack.declare::<rds::SubnetGroup>(
            name,
            SubnetGroupArgs {
                description: format!("Subnet group for {}", name),
                subnet_ids,
                tags: args.tags.clone(),
            },
            component.child_options(),
        )?;

        let security_group = network_boundary(
            stack,
            &component,
            name,
            format!("Security group for PrivateDatabase {}", name),
            &args.vpc_id,
            args.port,
            &args.tags,
        )?;

        let (generated_password, password) = match args.password {
            Some(password) => (None, password),
            None => {
                let generated = stack.declare::<RandomPassword>(
                    name,
                    RandomPasswordArgs::new(16).with_special(PASSWORD_SYMBOLS, 1),
                    component.child_options(),
                )?;
                let result = generated.result.clone();
                (Some(generated), result)
            }
        };

        // Keeps repeated create/destroy cycles from colliding on snapshot names
        let snapshot_suffix = stack.declare::<RandomString>(
            name,
            RandomStringArgs::name_safe(4),
            component.child_options(),
        )?;
        let final_snapshot_identifier = Output::concat([
            Output::new(format!("{}-", name)),
            snapshot_suffix.result.clone(),
            Output::from("-deleted"),
        ]);

        let instance = stack.declare::<rds::Instance>(
            name,
            InstanceArgs {
                db_subnet_group_name: subnet_group.name.clone(),
                allocated_storage: args.disk_size,
                copy_tags_to_snapshot: true,
                db_name: args.db_name.clone(),
                engine: args.engine.clone(),
                engine_version: args.engine_version.clone(),
                instance_class: args.instance_class.clone(),
                port: args.port,
                vpc_security_group_ids: one(&security_group.id),
                username: args.username.clone(),
                password,
                skip_final_snapshot: !args.production,
                final_snapshot_identifier,
                tags: args.tags.clone(),
            },
            ResourceOptions::parent(&subnet_group.urn),
        )?;

        let admin_password = stack.declare::<Parameter>(
            name,
            ParameterArgs::secure_string(instance.password.clone(), args.tags.clone()),
            component.child_options(),
        )?;

        tracing::debug!(name, production = args.production, "Declared PrivateDatabase");

        Ok(Self {
            component,
            subnet_group,
            security_group,
            generated_password,
            snapshot_suffix,
            instance,
            admin_password,
        })
    }
}
