//! `twin init` で生成するひな形
//!
//! デプロイメント定義と、各リージョンのインスタンス起動スクリプト。

/// デプロイメント定義のひな形
pub const STARTER_DEPLOYMENT: &str = r#"// twinstack deployment
project "twinstack"

// 状態確認の間隔（秒）と最大試行回数
// 既定は 90 回（約15分）で打ち切り。max-attempts=0 なら完了するまで待ち続ける
poll interval=10 max-attempts=90

variables {
    app_repository "https://example.com/your-org/tasks.git"
    db_name "tasks"
    db_user "cloud"
    db_password "cloud"
}

region "database" {
    name "us-east-2"
    image "ami-0dd9f0e7df0f0a138"
    instance-type "t2.micro"
    key-pair "twinstack-database" file="database_instance"
    security-group "twinstack-postgres" {
        ingress 22
        ingress 5432
    }
    instance user-data="scripts/postgres.sh"
}

region "app" {
    name "us-east-1"
    image "ami-00ddb0e5626798373"
    instance-type "t2.micro"
    key-pair "twinstack-app" file="app_instance"
    security-group "twinstack-app" {
        ingress 22
        ingress 8080
    }
    instance user-data="scripts/app.sh"
    image-name "twinstack-app-image"
    load-balancer "twinstack-lb" port=8080
    launch-configuration "twinstack-launch"
    autoscaling "twinstack-asg" min=2 max=3 desired=2
}
"#;

/// データベース層の起動スクリプト
/// PostgreSQL をインストールし、外部接続を許可する
pub const POSTGRES_SETUP: &str = r#"#!/bin/bash
set -e

apt-get update
apt-get install -y postgresql postgresql-contrib

sudo -u postgres psql -c "CREATE USER {{ db_user }} WITH PASSWORD '{{ db_password }}';"
sudo -u postgres createdb -O {{ db_user }} {{ db_name }}

PG_CONF_DIR=$(ls -d /etc/postgresql/*/main | head -n 1)
sed -i "s/#listen_addresses = 'localhost'/listen_addresses = '*'/" "$PG_CONF_DIR/postgresql.conf"
echo "host all all 0.0.0.0/0 md5" >> "$PG_CONF_DIR/pg_hba.conf"

systemctl restart postgresql
"#;

/// アプリ層の起動スクリプト
/// タスクAPIを取得し、データベースの接続先を書き換えて 8080 番で起動する
pub const APP_SETUP: &str = r#"#!/bin/bash
set -e

apt-get update
apt-get install -y python3-pip git

cd /home/ubuntu
git clone {{ app_repository }} tasks
cd tasks
sed -i "s/node1/{{ database_ip }}/g" */settings.py

pip3 install -r requirements.txt
python3 manage.py migrate

cat > /etc/rc.local <<'RC'
#!/bin/bash
cd /home/ubuntu/tasks
python3 manage.py runserver 0.0.0.0:8080 &
exit 0
RC
chmod +x /etc/rc.local

python3 manage.py runserver 0.0.0.0:8080 &
"#;

/// ひな形ファイル（相対パス, 内容）の一覧
pub fn starter_files() -> [(&'static str, &'static str); 3] {
    [
        ("twinstack.kdl", STARTER_DEPLOYMENT),
        ("scripts/postgres.sh", POSTGRES_SETUP),
        ("scripts/app.sh", APP_SETUP),
    ]
}
