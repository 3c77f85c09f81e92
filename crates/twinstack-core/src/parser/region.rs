//! region ノードのパース

use super::{arg_string, arg_value, args, prop_bool, prop_integer, prop_string};
use crate::error::{CoreError, Result};
use crate::model::{
    AutoScalingSpec, ImageSpec, IngressRule, InstanceSpec, KeyPairSpec, LaunchConfigurationSpec,
    LoadBalancerSpec, RegionStack, SecurityGroupSpec, StackRole, Tag,
};
use kdl::KdlNode;
use std::path::PathBuf;

const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
const DEFAULT_SG_DESCRIPTION: &str = "Security group created by twinstack";
const DEFAULT_APP_PORT: u16 = 8080;
const DEFAULT_DB_PORT: u16 = 5432;
const SSH_PORT: u16 = 22;

/// パース途中のリージョン定義
///
/// 省略された名前やタグはプロジェクト名から補完するため、
/// 全ノードを読み終えてから `finish` で確定させる。
#[derive(Debug)]
pub struct RegionDraft {
    pub role: StackRole,
    region: Option<String>,
    image_id: Option<String>,
    instance_type: Option<String>,
    key_pair: Option<KeyPairDraft>,
    security_group: Option<SecurityGroupDraft>,
    instance_tag: Option<Tag>,
    user_data: Option<PathBuf>,
    image_name: Option<String>,
    load_balancer: Option<LoadBalancerDraft>,
    launch_configuration: Option<(String, bool)>,
    autoscaling: Option<AutoScalingSpec>,
}

#[derive(Debug, Default)]
struct KeyPairDraft {
    name: Option<String>,
    file_name: Option<String>,
    tag: Option<Tag>,
}

#[derive(Debug, Default)]
struct SecurityGroupDraft {
    name: Option<String>,
    description: Option<String>,
    tag: Option<Tag>,
    ingress: Vec<IngressRule>,
}

#[derive(Debug)]
struct LoadBalancerDraft {
    name: String,
    port: u16,
    instance_port: u16,
    protocol: String,
    tag: Option<Tag>,
}

impl RegionDraft {
    fn new(role: StackRole) -> Self {
        Self {
            role,
            region: None,
            image_id: None,
            instance_type: None,
            key_pair: None,
            security_group: None,
            instance_tag: None,
            user_data: None,
            image_name: None,
            load_balancer: None,
            launch_configuration: None,
            autoscaling: None,
        }
    }

    /// 省略値を補完して RegionStack を確定
    pub fn finish(self, project: &str) -> Result<RegionStack> {
        let role = self.role;
        let prefix = format!("{}-{}", project, role);

        let region = self.region.ok_or_else(|| {
            CoreError::InvalidConfig(format!("region \"{}\" に name がありません", role))
        })?;
        let image_id = self.image_id.ok_or_else(|| {
            CoreError::InvalidConfig(format!("region \"{}\" に image がありません", role))
        })?;
        let instance_type = self
            .instance_type
            .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string());

        let kp = self.key_pair.unwrap_or_default();
        let key_pair = KeyPairSpec {
            name: kp.name.unwrap_or_else(|| prefix.clone()),
            file_name: kp.file_name.unwrap_or_else(|| format!("{}_instance", role)),
            tag: kp.tag.unwrap_or_else(|| Tag::name(format!("{}-key", prefix))),
        };

        let sg = self.security_group.unwrap_or_default();
        let ingress = if sg.ingress.is_empty() {
            default_ingress(role)
        } else {
            sg.ingress
        };
        let security_group = SecurityGroupSpec {
            name: sg.name.unwrap_or_else(|| prefix.clone()),
            description: sg
                .description
                .unwrap_or_else(|| DEFAULT_SG_DESCRIPTION.to_string()),
            tag: sg.tag.unwrap_or_else(|| Tag::name(format!("{}-sg", prefix))),
            ingress,
        };

        let instance = InstanceSpec {
            image_id,
            instance_type: instance_type.clone(),
            tag: self
                .instance_tag
                .unwrap_or_else(|| Tag::name(format!("{}-instance", prefix))),
            user_data: self.user_data,
        };

        let load_balancer = self.load_balancer.map(|lb| LoadBalancerSpec {
            tag: lb.tag.unwrap_or_else(|| Tag::name(format!("{}-lb", prefix))),
            name: lb.name,
            port: lb.port,
            instance_port: lb.instance_port,
            protocol: lb.protocol,
        });

        let launch_configuration =
            self.launch_configuration
                .map(|(name, monitoring)| LaunchConfigurationSpec {
                    name,
                    instance_type,
                    monitoring,
                });

        Ok(RegionStack {
            role,
            region,
            key_pair,
            security_group,
            instance,
            image: self.image_name.map(|name| ImageSpec { name }),
            load_balancer,
            launch_configuration,
            autoscaling: self.autoscaling,
        })
    }
}

fn default_ingress(role: StackRole) -> Vec<IngressRule> {
    match role {
        StackRole::Database => vec![IngressRule::tcp(SSH_PORT), IngressRule::tcp(DEFAULT_DB_PORT)],
        StackRole::App => vec![IngressRule::tcp(SSH_PORT), IngressRule::tcp(DEFAULT_APP_PORT)],
    }
}

/// region ノードをパース
///
/// 例:
/// ```kdl
/// region "database" {
///     name "us-east-2"
///     image "ami-0dd9f0e7df0f0a138"
///     key-pair "twinstack-db" file="database_instance"
///     instance user-data="scripts/postgres.sh"
/// }
/// ```
pub fn parse_region(node: &KdlNode) -> Result<RegionDraft> {
    let role: StackRole = arg_string(node)
        .ok_or_else(|| {
            CoreError::InvalidConfig("region には役割 (database / app) が必要です".to_string())
        })?
        .parse()
        .map_err(CoreError::InvalidConfig)?;

    let mut draft = RegionDraft::new(role);

    let Some(children) = node.children() else {
        return Ok(draft);
    };

    for child in children.nodes() {
        match child.name().value() {
            "name" | "region" => {
                draft.region = arg_string(child);
            }
            "image" | "image-id" | "image_id" | "ami" => {
                draft.image_id = arg_string(child);
            }
            "instance-type" | "instance_type" => {
                draft.instance_type = arg_string(child);
            }
            "key-pair" | "key_pair" => {
                draft.key_pair = Some(KeyPairDraft {
                    name: arg_string(child),
                    file_name: prop_string(child, &["file", "file-name", "file_name"]),
                    tag: parse_tag(child),
                });
            }
            "security-group" | "security_group" => {
                draft.security_group = Some(parse_security_group(child)?);
            }
            "instance" => {
                draft.instance_tag = parse_tag(child);
                draft.user_data = prop_string(child, &["user-data", "user_data"]).map(PathBuf::from);
            }
            "image-name" | "image_name" => {
                draft.image_name = arg_string(child);
            }
            "load-balancer" | "load_balancer" => {
                draft.load_balancer = Some(parse_load_balancer(child)?);
            }
            "launch-configuration" | "launch_configuration" => {
                let name = arg_string(child).ok_or_else(|| {
                    CoreError::InvalidConfig("launch-configuration requires a name".to_string())
                })?;
                let monitoring = prop_bool(child, &["monitoring"]).unwrap_or(true);
                draft.launch_configuration = Some((name, monitoring));
            }
            "autoscaling" | "auto-scaling" | "auto_scaling" => {
                draft.autoscaling = Some(parse_autoscaling(child)?);
            }
            other => {
                tracing::debug!(node = other, role = %role, "Skipping unknown region node");
            }
        }
    }

    Ok(draft)
}

/// `tag="value"`（必要なら `tag-key="Env"`）をパース
fn parse_tag(node: &KdlNode) -> Option<Tag> {
    let value = prop_string(node, &["tag"])?;
    let key = prop_string(node, &["tag-key", "tag_key"]);
    Some(match key {
        Some(key) => Tag::new(key, value),
        None => Tag::name(value),
    })
}

fn parse_security_group(node: &KdlNode) -> Result<SecurityGroupDraft> {
    let mut sg = SecurityGroupDraft {
        name: arg_string(node),
        tag: parse_tag(node),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "description" => {
                    sg.description = arg_string(child);
                }
                "ingress" => {
                    sg.ingress.push(parse_ingress(child)?);
                }
                _ => {}
            }
        }
    }

    Ok(sg)
}

/// ingress ノードをパース
///
/// 例: `ingress 22` / `ingress 8000 to=8100 protocol="udp" cidr="10.0.0.0/8"`
fn parse_ingress(node: &KdlNode) -> Result<IngressRule> {
    let from = arg_value(node)
        .and_then(|v| v.as_integer())
        .ok_or_else(|| CoreError::InvalidConfig("ingress requires a port".to_string()))?;
    let from_port = port_number(from)?;
    let to_port = match prop_integer(node, &["to", "to-port", "to_port"]) {
        Some(to) => port_number(to)?,
        None => from_port,
    };

    let mut rule = IngressRule::tcp(from_port);
    rule.to_port = to_port;
    if let Some(protocol) = prop_string(node, &["protocol"]) {
        rule.protocol = protocol;
    }
    if let Some(cidr) = prop_string(node, &["cidr"]) {
        rule.cidr = cidr;
    }
    Ok(rule)
}

fn parse_load_balancer(node: &KdlNode) -> Result<LoadBalancerDraft> {
    let name = arg_string(node).ok_or_else(|| {
        CoreError::InvalidConfig("load-balancer requires a name".to_string())
    })?;
    let port = match prop_integer(node, &["port"]) {
        Some(p) => port_number(p)?,
        None => DEFAULT_APP_PORT,
    };
    let instance_port = match prop_integer(node, &["instance-port", "instance_port"]) {
        Some(p) => port_number(p)?,
        None => port,
    };

    Ok(LoadBalancerDraft {
        name,
        port,
        instance_port,
        protocol: prop_string(node, &["protocol"]).unwrap_or_else(|| "HTTP".to_string()),
        tag: parse_tag(node),
    })
}

/// autoscaling ノードをパース
///
/// 位置引数の数値でも `min=2 max=3 desired=2` でも指定できる。
fn parse_autoscaling(node: &KdlNode) -> Result<AutoScalingSpec> {
    let name = arg_string(node)
        .ok_or_else(|| CoreError::InvalidConfig("autoscaling requires a name".to_string()))?;

    let mut spec = AutoScalingSpec {
        name,
        min_size: 2,
        max_size: 3,
        desired_capacity: 2,
    };

    let numbers: Vec<i128> = args(node).filter_map(|v| v.as_integer()).collect();
    if let [min, max, desired] = numbers[..] {
        spec.min_size = to_size(min)?;
        spec.max_size = to_size(max)?;
        spec.desired_capacity = to_size(desired)?;
    }

    if let Some(min) = prop_integer(node, &["min", "min-size", "min_size"]) {
        spec.min_size = to_size(min)?;
    }
    if let Some(max) = prop_integer(node, &["max", "max-size", "max_size"]) {
        spec.max_size = to_size(max)?;
    }
    if let Some(desired) = prop_integer(node, &["desired", "desired-capacity", "desired_capacity"])
    {
        spec.desired_capacity = to_size(desired)?;
    }

    Ok(spec)
}

fn port_number(value: i128) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| CoreError::InvalidConfig(format!("ポート番号が範囲外です: {}", value)))
}

fn to_size(value: i128) -> Result<i32> {
    i32::try_from(value)
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| CoreError::InvalidConfig(format!("台数が不正です: {}", value)))
}
