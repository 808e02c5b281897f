use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const RECAPTCHA_SECRET: &str = "6Lc-recaptcha-secret-value";

/// Stack file for a project whose vpc, ecs and loadbalancer stacks exist
pub fn stack_file(with_dns: bool) -> String {
    let dns = if with_dns {
        r#"
dns:
  zone_id: 023e105f4ecef8ad9ca31a8372d0c353
  domain: brig.gs
  listener_priority: 10
"#
    } else {
        ""
    };

    format!(
        r#"project: kutt
region: us-west-2
config:
  site_name: brig.gs
  admin_emails: ops@brig.gs
secrets:
  recaptcha_site_key: 6Lc-recaptcha-site-key
  recaptcha_secret_key: {secret}
  google_safe_browsing_api_key: safe-browsing-key
tags:
  Name: kutt
  environment: production
  project: kutt
references:
  jaxxstorm/vpc/prod:
    vpc_id: vpc-0a1b2c3d
    private_subnet_ids: [subnet-private-a, subnet-private-b]
  jaxxstorm/ecs/prod:
    cluster_arn: arn:aws:ecs:us-west-2:123456789012:cluster/main
  jaxxstorm/loadbalancer/prod:
    target_group_arn: arn:aws:elasticloadbalancing:us-west-2:123456789012:targetgroup/kutt/6d0ecf831eec9f09
    lb_dns_name: web-1234567890.us-west-2.elb.amazonaws.com
    https_listener_arn: arn:aws:elasticloadbalancing:us-west-2:123456789012:listener/app/web/50dc6c495c0c9188/f2f7dc8efc522ab2
{dns}simulation:
  account_id: "123456789012"
  vpcs:
    vpc-0a1b2c3d: 10.0.0.0/16
"#,
        secret = RECAPTCHA_SECRET,
        dns = dns,
    )
}

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_stack_file(content: &str) -> Self {
        let project = Self::new();
        project.write("Kutt.prod.yaml", content);
        project
    }

    pub fn write(&self, name: &str, content: &str) {
        let path = self.root.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// `kutt-infra` running inside the project with a clean environment
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("kutt-infra").unwrap();
        cmd.current_dir(self.path())
            .env_remove("KUTT_INFRA_CONFIG")
            .env_remove("KUTT_INFRA_STACK")
            .env_remove("RUST_LOG");
        cmd
    }
}
